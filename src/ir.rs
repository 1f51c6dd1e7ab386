//! The closed intermediate representation produced by translation and
//! mapping: statements, widgets, views, actions, entities, correlation.
//!
//! Every variant set here is closed on purpose. Anything the translator
//! cannot classify is preserved verbatim as `Statement::Raw`, so the IR
//! never loses information.

use serde::{Deserialize, Serialize};

use crate::facts::{CallSite, HttpMethod, RouteFact};

// ═══════════════════════════════════════════════════════════════════════════════
// ENTITIES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    Date,
    Time,
    Datetime,
    Object,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::Datetime => "datetime",
            FieldType::Object => "object",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    One,
    Many,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Schema,
    Heuristic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityField {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl EntityField {
    pub fn required(name: &str, field_type: FieldType) -> Self {
        EntityField {
            name: name.to_string(),
            field_type,
            required: true,
            default: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub name: String,
    pub target: String,
    pub cardinality: Cardinality,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Canonical name, unique within one run.
    pub name: String,
    pub fields: Vec<EntityField>,
    pub relations: Vec<Relation>,
    pub provenance: Provenance,
    /// Resolver confidence band; presentation confidence is layered on
    /// top during aggregation.
    pub confidence: f64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATEMENTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Statement {
    Call {
        method: HttpMethod,
        /// Normalized path: template/concat segments collapsed to `:param`.
        path: String,
        body_fields: Vec<String>,
        /// Variable name when the call initialized a declaration.
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<String>,
    },
    Load {
        model: String,
        one: bool,
        by_id: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<String>,
    },
    Set {
        target: String,
        value: String,
    },
    Conditional {
        condition: String,
        then_branch: Vec<Statement>,
        else_branch: Vec<Statement>,
    },
    Return {
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    Add {
        model: String,
        fields: Vec<String>,
    },
    Remove {
        model: String,
        by_id: bool,
    },
    Show {
        view: String,
    },
    Raw {
        text: String,
        reason: String,
    },
}

impl Statement {
    pub fn is_raw(&self) -> bool {
        matches!(self, Statement::Raw { .. })
    }
}

/// Per-kind tally of intentionally elided statements. Elision is never
/// silent: the counts travel with the translation so a reviewer can see
/// exactly what was dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipTally {
    pub debug_log: usize,
    pub prevent_default: usize,
    pub stop_propagation: usize,
}

impl SkipTally {
    pub fn total(&self) -> usize {
        self.debug_log + self.prevent_default + self.stop_propagation
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub statements: Vec<Statement>,
    pub skipped: SkipTally,
    /// Fraction of emitted statements (at all nesting levels) that are
    /// not raw; 1.0 when the body legitimately emitted nothing.
    pub confidence: f64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// WIDGETS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Widget {
    Button(ButtonWidget),
    Form(FormWidget),
    List(ListWidget),
    Input(InputWidget),
    Text(TextWidget),
    Link(LinkWidget),
    Container(ContainerWidget),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonWidget {
    pub label: String,
    /// Resolved action name; never empty once resolution has run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormWidget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    pub children: Vec<Widget>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListWidget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub children: Vec<Widget>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputWidget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub input_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextWidget {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkWidget {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerWidget {
    pub children: Vec<Widget>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// VIEWS & ACTIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateBinding {
    pub variable: String,
    pub entity: String,
    pub cardinality: Cardinality,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub name: String,
    pub kind: crate::facts::ComponentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_path: Option<String>,
    pub widgets: Vec<Widget>,
    pub bindings: Vec<StateBinding>,
}

/// The closed operation vocabulary an action may carry. Kept alongside
/// any full statement translation for correlation purposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Operation {
    Add {
        #[serde(skip_serializing_if = "Option::is_none")]
        entity: Option<String>,
    },
    Update {
        #[serde(skip_serializing_if = "Option::is_none")]
        entity: Option<String>,
    },
    Remove {
        #[serde(skip_serializing_if = "Option::is_none")]
        entity: Option<String>,
    },
    Call {
        method: HttpMethod,
        path: String,
    },
    Load {
        #[serde(skip_serializing_if = "Option::is_none")]
        entity: Option<String>,
    },
    Show {
        view: String,
    },
    Set {
        target: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub name: String,
    pub trigger: String,
    pub params: Vec<String>,
    pub operations: Vec<Operation>,
    /// Full statement translation; takes rendering precedence over the
    /// operation list when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Translation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// CORRELATION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationMatch {
    /// Component the call site was observed in.
    pub component: String,
    pub call: CallSite,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteFact>,
    pub confidence: f64,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationReport {
    pub matches: Vec<CorrelationMatch>,
    pub frontend_orphans: Vec<CallSite>,
    pub backend_orphans: Vec<RouteFact>,
    /// Mean match confidence over all calls; 1.0 when there are none.
    pub confidence: f64,
}
