//! Fact types extracted from individual source files.
//!
//! A fact is a provenance-tagged observation about exactly one file,
//! produced before any cross-file aggregation. Facts are immutable once
//! parsed; every later stage reads them and builds its own structures.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// HTTP METHODS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// The fixed set of exported handler names a route file may declare.
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ];

    pub fn parse(s: &str) -> Option<HttpMethod> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether the method implies a state change on the backend.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, HttpMethod::Get)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT FACTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Page,
    Component,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropDecl {
    pub name: String,
    /// Declared type text, or "unknown" when the element type cannot be
    /// statically resolved.
    pub type_text: String,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateVar {
    pub name: String,
    pub setter: String,
    pub type_text: String,
    pub initializer: Option<String>,
}

/// One element of the component's JSX tree.
///
/// Text content from immediate children is gathered into `text`; a child
/// expression of the shape `source.map(item => <jsx/>)` hoists its parsed
/// item markup into `children` and records the iteration source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsxElement {
    pub kind: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<JsxElement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_item_var: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl JsxElement {
    pub fn new(kind: &str) -> Self {
        JsxElement {
            kind: kind.to_string(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
            list_source: None,
            list_item_var: None,
            text: None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerFact {
    /// Named handlers keep their declared name; inline handlers get "".
    pub name: String,
    /// Trigger event, lowercased with the `on` prefix stripped ("click").
    pub trigger: String,
    pub body: String,
    pub params: Vec<String>,
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSite {
    pub method: HttpMethod,
    /// Path argument text exactly as written (quotes, templates, concat).
    pub path: String,
    pub body_fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectFact {
    pub deps: Vec<String>,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentFact {
    pub name: String,
    pub kind: ComponentKind,
    pub file_path: String,
    pub props: Vec<PropDecl>,
    pub state: Vec<StateVar>,
    pub jsx: Option<JsxElement>,
    pub handlers: Vec<HandlerFact>,
    pub calls: Vec<CallSite>,
    pub effects: Vec<EffectFact>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROUTE FACTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "kebab-case")]
pub enum PathSegment {
    Literal(String),
    Param(String),
    CatchAll(String),
    OptionalCatchAll(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataOp {
    ReadAll,
    ReadOne,
    Create,
    Update,
    Delete,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteFact {
    pub method: HttpMethod,
    pub segments: Vec<PathSegment>,
    pub operation: DataOp,
    pub model: Option<String>,
    pub body_fields: Vec<String>,
    /// Raw handler statements, in source order.
    pub statements: Vec<String>,
    pub status: Option<u16>,
    pub file_path: String,
}

impl RouteFact {
    /// Renders the path template: named params as `:name`, catch-alls as
    /// `*name`.
    pub fn path_text(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            out.push('/');
            match seg {
                PathSegment::Literal(s) => out.push_str(s),
                PathSegment::Param(name) => {
                    out.push(':');
                    out.push_str(name);
                }
                PathSegment::CatchAll(name) | PathSegment::OptionalCatchAll(name) => {
                    out.push('*');
                    out.push_str(name);
                }
            }
        }
        if out.is_empty() {
            out.push('/');
        }
        out
    }

    pub fn path_params(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| !matches!(s, PathSegment::Literal(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parse_is_case_insensitive() {
        assert_eq!(HttpMethod::parse("get"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::parse("DELETE"), Some(HttpMethod::Delete));
        assert_eq!(HttpMethod::parse("TRACE"), None);
    }

    #[test]
    fn mutating_methods() {
        assert!(!HttpMethod::Get.is_mutating());
        assert!(HttpMethod::Post.is_mutating());
        assert!(HttpMethod::Delete.is_mutating());
    }

    #[test]
    fn path_text_renders_params_and_catch_alls() {
        let route = RouteFact {
            method: HttpMethod::Get,
            segments: vec![
                PathSegment::Literal("api".into()),
                PathSegment::Literal("tasks".into()),
                PathSegment::Param("id".into()),
            ],
            operation: DataOp::ReadOne,
            model: Some("task".into()),
            body_fields: vec![],
            statements: vec![],
            status: None,
            file_path: "app/api/tasks/[id]/route.ts".into(),
        };
        assert_eq!(route.path_text(), "/api/tasks/:id");
        assert_eq!(route.path_params(), 1);

        let all = RouteFact {
            segments: vec![
                PathSegment::Literal("api".into()),
                PathSegment::CatchAll("slug".into()),
            ],
            ..route
        };
        assert_eq!(all.path_text(), "/api/*slug");
    }
}
