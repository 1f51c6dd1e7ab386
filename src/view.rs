//! JSX-to-view mapping and handler-to-action assembly.
//!
//! Widget classification is a fixed, first-match tag table; everything
//! unclassified with children recurses into a container, childless
//! unknown tags contribute nothing. Action naming runs an ordered rule
//! table over the bound handler text; entity inference checks class
//! tokens and the explicit entity-marker attribute against the known
//! entity set and otherwise leaves the slot unset for human completion.

use lazy_static::lazy_static;
use regex::Regex;

use crate::facts::{ComponentFact, ComponentKind, JsxElement};
use crate::ir::{
    Action, ButtonWidget, Cardinality, ContainerWidget, Entity, FormWidget, InputWidget,
    LinkWidget, ListWidget, Operation, StateBinding, Statement, TextWidget, View, Widget,
};
use crate::translate::translate_frontend;

/// Attribute naming an element's entity explicitly.
const ENTITY_MARKER_ATTR: &str = "data-entity";

lazy_static! {
    static ref CALL_NAME_RE: Regex = Regex::new(r"([A-Za-z_$][\w$]*)\s*\(").unwrap();
    static ref IDENT_RE: Regex = Regex::new(r"^[A-Za-z_$][\w$]*$").unwrap();
    static ref SUFFIX_HINT_RE: Regex = Regex::new(
        r"\b([A-Za-z_$][\w$]*(?:Handler|Action|Submit|Click|Create|Update|Delete|Save|Load|Fetch))\b"
    )
    .unwrap();
    static ref ANY_IDENT_RE: Regex = Regex::new(r"[A-Za-z_$][\w$]{2,}").unwrap();
    static ref ARRAY_TYPE_RE: Regex = Regex::new(r"^([A-Z][A-Za-z0-9_]*)\[\]$").unwrap();
}

/// Maps one component fact into a view and its actions. Components that
/// carry no JSX tree produce nothing.
pub fn map_component(fact: &ComponentFact, entities: &[Entity]) -> Option<(View, Vec<Action>)> {
    let jsx = fact.jsx.as_ref()?;

    let view = View {
        name: fact.name.clone(),
        kind: fact.kind,
        route_path: page_route_path(&fact.file_path, fact.kind),
        widgets: map_children(jsx, entities),
        bindings: state_bindings(fact, entities),
    };

    let actions = fact
        .handlers
        .iter()
        .map(|handler| {
            let body = (!handler.body.is_empty()).then(|| translate_frontend(&handler.body));
            let name = action_name(if handler.name.is_empty() {
                &handler.body
            } else {
                &handler.name
            });
            let operations = body
                .as_ref()
                .map(|t| operations_from_statements(&t.statements))
                .filter(|ops| !ops.is_empty())
                .unwrap_or_else(|| keyword_operations(&handler.name, entities));
            Action {
                name,
                trigger: handler.trigger.clone(),
                params: handler.params.clone(),
                operations,
                body,
                handler: (!handler.name.is_empty()).then(|| handler.name.clone()),
            }
        })
        .collect();

    Some((view, actions))
}

// ═══════════════════════════════════════════════════════════════════════════════
// WIDGET CLASSIFICATION
// ═══════════════════════════════════════════════════════════════════════════════

fn map_children(element: &JsxElement, entities: &[Entity]) -> Vec<Widget> {
    element
        .children
        .iter()
        .filter_map(|child| classify(child, entities))
        .collect()
}

/// Fixed first-match classification over the element kind.
fn classify(element: &JsxElement, entities: &[Entity]) -> Option<Widget> {
    let kind = element.kind.as_str();

    if is_button_like(element) {
        return Some(Widget::Button(ButtonWidget {
            label: element
                .text
                .clone()
                .filter(|t| !t.is_empty())
                .or_else(|| element.attr("value").map(String::from))
                .unwrap_or_else(|| "Button".to_string()),
            action: element
                .attr("onClick")
                .or_else(|| element.attr("onSubmit"))
                .map(action_name),
        }));
    }

    if kind == "ul" || kind == "ol" || element.list_source.is_some() {
        return Some(Widget::List(ListWidget {
            entity: infer_entity(element, entities),
            source: element.list_source.clone(),
            children: map_children(element, entities),
        }));
    }

    if kind == "form" {
        return Some(Widget::Form(FormWidget {
            entity: infer_entity(element, entities),
            action: element.attr("onSubmit").map(action_name),
            children: map_children(element, entities),
        }));
    }

    if matches!(kind, "input" | "textarea" | "select") {
        return Some(Widget::Input(InputWidget {
            name: element.attr("name").map(String::from),
            input_type: match kind {
                "input" => element.attr("type").unwrap_or("text").to_string(),
                other => other.to_string(),
            },
        }));
    }

    if matches!(
        kind,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "p" | "label" | "span" | "legend" | "strong"
            | "em"
    ) {
        return Some(Widget::Text(TextWidget {
            content: element.text.clone().unwrap_or_default(),
        }));
    }

    if kind == "a" || kind == "Link" {
        return Some(Widget::Link(LinkWidget {
            label: element.text.clone().unwrap_or_default(),
            to: element
                .attr("href")
                .or_else(|| element.attr("to"))
                .map(String::from),
        }));
    }

    if !element.children.is_empty() {
        return Some(Widget::Container(ContainerWidget {
            children: map_children(element, entities),
        }));
    }

    None
}

fn is_button_like(element: &JsxElement) -> bool {
    if element.kind == "button" {
        return true;
    }
    if element.attr("role") == Some("button") {
        return true;
    }
    element.kind == "input" && matches!(element.attr("type"), Some("submit") | Some("button"))
}

/// Class tokens and the explicit marker attribute, checked against the
/// known entity names. A trailing plural `s` on a token is ignored.
fn infer_entity(element: &JsxElement, entities: &[Entity]) -> Option<String> {
    let mut tokens: Vec<String> = Vec::new();
    if let Some(marker) = element.attr(ENTITY_MARKER_ATTR) {
        tokens.push(marker.to_lowercase());
    }
    if let Some(class) = element.attr("className").or_else(|| element.attr("class")) {
        tokens.extend(
            class
                .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
                .map(str::to_lowercase),
        );
    }
    if let Some(source) = &element.list_source {
        tokens.push(source.to_lowercase());
    }

    for token in tokens {
        let singular = token.strip_suffix('s').unwrap_or(&token);
        for entity in entities {
            let name = entity.name.to_lowercase();
            if token == name || singular == name {
                return Some(entity.name.clone());
            }
        }
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════════
// ACTION NAMING
// ═══════════════════════════════════════════════════════════════════════════════

/// Ordered naming rules over the bound handler text; first match wins.
const NAME_RULES: [fn(&str) -> Option<String>; 4] = [
    |text| {
        // Direct call expression: `handleDelete(t.id)`. A callee preceded
        // by `.` is a method call, not a named handler.
        for caps in CALL_NAME_RE.captures_iter(text) {
            let Some(m) = caps.get(1) else { continue };
            if text[..m.start()].ends_with('.') {
                continue;
            }
            if crate::scan::is_js_keyword(m.as_str()) {
                continue;
            }
            return Some(m.as_str().to_string());
        }
        None
    },
    |text| IDENT_RE.is_match(text.trim()).then(|| text.trim().to_string()),
    |text| SUFFIX_HINT_RE.captures(text).map(|c| c[1].to_string()),
    |text| {
        ANY_IDENT_RE
            .find_iter(text)
            .map(|m| m.as_str())
            .find(|n| !crate::scan::is_js_keyword(n))
            .map(String::from)
    },
];

/// Resolves the display name for an action from the raw handler text.
/// Never empty: `handle`/`on` prefixes are stripped, the result is
/// PascalCased, and "Action" is the terminal fallback.
pub fn action_name(text: &str) -> String {
    for rule in NAME_RULES {
        if let Some(raw) = rule(text) {
            let stripped = raw
                .strip_prefix("handle")
                .or_else(|| raw.strip_prefix("on"))
                .unwrap_or(&raw);
            let name = pascal_case(stripped);
            if !name.is_empty() {
                return name;
            }
        }
    }
    "Action".to_string()
}

fn pascal_case(word: &str) -> String {
    let mut out = String::new();
    let mut upper_next = true;
    for c in word.chars() {
        if c.is_ascii_alphanumeric() {
            if upper_next {
                out.extend(c.to_uppercase());
                upper_next = false;
            } else {
                out.push(c);
            }
        } else {
            upper_next = true;
        }
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Operations derived from translated statements, kept for correlation
/// even when the full translation takes rendering precedence.
fn operations_from_statements(statements: &[Statement]) -> Vec<Operation> {
    let mut operations = Vec::new();
    for statement in statements {
        match statement {
            Statement::Call {
                method,
                path,
                ..
            } => operations.push(Operation::Call {
                method: *method,
                path: path.clone(),
            }),
            Statement::Show { view } => operations.push(Operation::Show { view: view.clone() }),
            Statement::Set { target, .. } => operations.push(Operation::Set {
                target: target.clone(),
            }),
            Statement::Load { model, .. } => operations.push(Operation::Load {
                entity: Some(model.clone()),
            }),
            Statement::Conditional {
                then_branch,
                else_branch,
                ..
            } => {
                operations.extend(operations_from_statements(then_branch));
                operations.extend(operations_from_statements(else_branch));
            }
            _ => {}
        }
    }
    operations
}

/// Keyword-bucket fallback on the handler name when no call site is
/// attributable.
fn keyword_operations(handler_name: &str, entities: &[Entity]) -> Vec<Operation> {
    let lower = handler_name.to_lowercase();
    if lower.is_empty() {
        return Vec::new();
    }
    let entity = entities
        .iter()
        .find(|e| lower.contains(&e.name.to_lowercase()))
        .map(|e| e.name.clone());

    let contains_any = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if contains_any(&["add", "create", "new"]) {
        vec![Operation::Add { entity }]
    } else if contains_any(&["update", "edit", "save"]) {
        vec![Operation::Update { entity }]
    } else if contains_any(&["delete", "remove"]) {
        vec![Operation::Remove { entity }]
    } else if contains_any(&["navigate", "goto", "redirect"]) {
        vec![Operation::Show {
            view: action_name(handler_name),
        }]
    } else if contains_any(&["load", "fetch", "get"]) {
        vec![Operation::Load { entity }]
    } else {
        Vec::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BINDINGS & ROUTES
// ═══════════════════════════════════════════════════════════════════════════════

fn state_bindings(fact: &ComponentFact, entities: &[Entity]) -> Vec<StateBinding> {
    let mut bindings = Vec::new();
    for state in &fact.state {
        let type_text = state.type_text.trim();
        let (candidate, cardinality) = match ARRAY_TYPE_RE.captures(type_text) {
            Some(caps) => (caps[1].to_string(), Cardinality::Many),
            None => (type_text.to_string(), Cardinality::One),
        };
        if let Some(entity) = entities.iter().find(|e| e.name == candidate) {
            bindings.push(StateBinding {
                variable: state.name.clone(),
                entity: entity.name.clone(),
                cardinality,
            });
        }
    }
    bindings
}

/// URL path for a page component, from its position in the route tree.
fn page_route_path(file_path: &str, kind: ComponentKind) -> Option<String> {
    if kind != ComponentKind::Page {
        return None;
    }
    let normalized = file_path.replace('\\', "/");
    let parts: Vec<&str> = normalized.split('/').filter(|p| !p.is_empty()).collect();
    let root = parts.iter().position(|p| *p == "app" || *p == "pages")?;
    let under_pages = parts[root] == "pages";

    let mut segments: Vec<String> = Vec::new();
    for part in &parts[root + 1..parts.len() - 1] {
        if part.starts_with('(') && part.ends_with(')') {
            continue;
        }
        segments.push(route_segment_text(part));
    }
    if under_pages {
        if let Some(stem) = parts.last().and_then(|f| f.split('.').next()) {
            if stem != "index" {
                segments.push(route_segment_text(stem));
            }
        }
    }

    if segments.is_empty() {
        Some("/".to_string())
    } else {
        Some(format!("/{}", segments.join("/")))
    }
}

fn route_segment_text(part: &str) -> String {
    if let Some(inner) = part.strip_prefix('[').and_then(|p| p.strip_suffix(']')) {
        let inner = inner
            .strip_prefix('[')
            .and_then(|p| p.strip_suffix(']'))
            .unwrap_or(inner);
        let name = inner.strip_prefix("...").unwrap_or(inner);
        format!(":{name}")
    } else {
        part.to_string()
    }
}
