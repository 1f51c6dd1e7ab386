//! Aggregation into the reviewable analysis model.
//!
//! Every detected fact gets a run-scoped unique id from an explicit
//! counter passed in by the caller; the id is the only channel through
//! which later human edits (enable/rename) reach the model, so the
//! underlying facts are never mutated. Presentation confidence is
//! layered over raw fact confidence per item type and is advisory only.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::facts::{ComponentKind, DataOp, RouteFact};
use crate::ir::{Action, CorrelationReport, Entity, Operation, View, Widget};

// ═══════════════════════════════════════════════════════════════════════════════
// ID COUNTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Run-scoped id source. Explicitly constructed and passed in, reset
/// between runs; never a hidden singleton, so runs stay independent.
#[derive(Debug, Default)]
pub struct IdCounter {
    next: u32,
}

impl IdCounter {
    pub fn new() -> Self {
        IdCounter { next: 1 }
    }

    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }

    pub fn reset(&mut self) {
        self.next = 1;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DETECTED ITEMS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Entity,
    View,
    Action,
    Route,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedItem {
    pub id: u32,
    pub item_type: ItemType,
    /// Original detected name; never edited.
    pub name: String,
    /// Editable display name, seeded from `name`.
    pub display_name: String,
    pub enabled: bool,
    pub confidence: f64,
    /// Provenance string: originating file or resolution path.
    pub source: String,
    /// Type-specific payload, serialized from the typed model.
    pub details: Value,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub items: Vec<DetectedItem>,
    pub entities: Vec<Entity>,
    pub views: Vec<View>,
    pub actions: Vec<Action>,
    pub routes: Vec<RouteFact>,
    pub correlation: CorrelationReport,
    pub warnings: Vec<String>,
}

impl Analysis {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// AGGREGATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Merges all resolved structures into one reviewable analysis.
pub fn aggregate(
    counter: &mut IdCounter,
    entities: Vec<Entity>,
    views: Vec<View>,
    actions: Vec<Action>,
    routes: Vec<RouteFact>,
    correlation: CorrelationReport,
    warnings: Vec<String>,
) -> Analysis {
    let mut items = Vec::new();

    for entity in &entities {
        items.push(DetectedItem {
            id: counter.next_id(),
            item_type: ItemType::Entity,
            name: entity.name.clone(),
            display_name: entity.name.clone(),
            enabled: true,
            confidence: entity_confidence(entity),
            source: format!("{:?}", entity.provenance).to_lowercase(),
            details: serde_json::to_value(entity).unwrap_or(Value::Null),
        });
    }

    for view in &views {
        items.push(DetectedItem {
            id: counter.next_id(),
            item_type: ItemType::View,
            name: view.name.clone(),
            display_name: view.name.clone(),
            enabled: true,
            confidence: view_confidence(view),
            source: view.route_path.clone().unwrap_or_else(|| "component".into()),
            details: serde_json::to_value(view).unwrap_or(Value::Null),
        });
    }

    for action in &actions {
        items.push(DetectedItem {
            id: counter.next_id(),
            item_type: ItemType::Action,
            name: action.name.clone(),
            display_name: action.name.clone(),
            enabled: true,
            confidence: action_confidence(action, &correlation),
            source: action.handler.clone().unwrap_or_else(|| "inline".into()),
            details: serde_json::to_value(action).unwrap_or(Value::Null),
        });
    }

    for route in &routes {
        let name = format!("{} {}", route.method, route.path_text());
        items.push(DetectedItem {
            id: counter.next_id(),
            item_type: ItemType::Route,
            name: name.clone(),
            display_name: name,
            enabled: true,
            confidence: route_confidence(route),
            source: route.file_path.clone(),
            details: serde_json::to_value(route).unwrap_or(Value::Null),
        });
    }

    Analysis {
        items,
        entities,
        views,
        actions,
        routes,
        correlation,
        warnings,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRESENTATION CONFIDENCE
// ═══════════════════════════════════════════════════════════════════════════════

fn entity_confidence(entity: &Entity) -> f64 {
    let detail = entity.fields.len() + entity.relations.len();
    (entity.confidence + 0.02 * detail as f64).min(0.95)
}

fn view_confidence(view: &View) -> f64 {
    let widgets = count_widgets(&view.widgets);
    let page_bonus = if view.kind == ComponentKind::Page {
        0.15
    } else {
        0.0
    };
    (0.5 + 0.05 * widgets as f64 + 0.05 * view.bindings.len() as f64 + page_bonus).min(0.95)
}

fn action_confidence(action: &Action, correlation: &CorrelationReport) -> f64 {
    let route_bonus = if action.operations.iter().any(|op| {
        matches!(op, Operation::Call { method, path } if correlation.matches.iter().any(|m| {
            m.route.is_some()
                && m.call.method == *method
                && crate::correlate::normalize_call_path(&m.call.path) == *path
        }))
    }) {
        0.2
    } else {
        0.0
    };
    (0.4 + 0.1 * action.operations.len() as f64 + route_bonus).min(0.95)
}

fn route_confidence(route: &RouteFact) -> f64 {
    let mut confidence: f64 = 0.6;
    if route.operation != DataOp::None {
        confidence += 0.1;
    }
    if !route.body_fields.is_empty() {
        confidence += 0.1;
    }
    if route.path_params() > 0 {
        confidence += 0.1;
    }
    confidence.min(0.9)
}

fn count_widgets(widgets: &[Widget]) -> usize {
    widgets
        .iter()
        .map(|w| {
            1 + match w {
                Widget::Form(f) => count_widgets(&f.children),
                Widget::List(l) => count_widgets(&l.children),
                Widget::Container(c) => count_widgets(&c.children),
                _ => 0,
            }
        })
        .sum()
}

// ═══════════════════════════════════════════════════════════════════════════════
// REVIEW OVERLAY
// ═══════════════════════════════════════════════════════════════════════════════

/// One human decision about one detected item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDecision {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
}

pub type ReviewOverlay = HashMap<u32, ReviewDecision>;

/// Applies review decisions by id. Unknown ids are ignored; underlying
/// facts are untouched, only items change.
pub fn apply_overlay(analysis: &mut Analysis, overlay: &ReviewOverlay) {
    for item in &mut analysis.items {
        if let Some(decision) = overlay.get(&item.id) {
            if let Some(enabled) = decision.enabled {
                item.enabled = enabled;
            }
            if let Some(rename) = &decision.rename {
                item.display_name = rename.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{HttpMethod, PathSegment};
    use crate::ir::{EntityField, FieldType, Provenance};
    use pretty_assertions::assert_eq;

    fn entity() -> Entity {
        Entity {
            name: "Task".into(),
            fields: vec![
                EntityField::required("id", FieldType::Number),
                EntityField::required("title", FieldType::Text),
            ],
            relations: vec![],
            provenance: Provenance::Schema,
            confidence: 0.9,
        }
    }

    fn route() -> RouteFact {
        RouteFact {
            method: HttpMethod::Get,
            segments: vec![
                PathSegment::Literal("api".into()),
                PathSegment::Literal("tasks".into()),
            ],
            operation: DataOp::ReadAll,
            model: Some("task".into()),
            body_fields: vec![],
            statements: vec![],
            status: None,
            file_path: "app/api/tasks/route.ts".into(),
        }
    }

    #[test]
    fn ids_are_unique_and_monotonic_within_a_run() {
        let mut counter = IdCounter::new();
        let analysis = aggregate(
            &mut counter,
            vec![entity()],
            vec![],
            vec![],
            vec![route(), route()],
            CorrelationReport::default(),
            vec![],
        );
        let ids: Vec<u32> = analysis.items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        counter.reset();
        assert_eq!(counter.next_id(), 1);
    }

    #[test]
    fn entity_confidence_rises_with_detail_and_caps() {
        assert_eq!(entity_confidence(&entity()), 0.9 + 0.04);
        let mut wide = entity();
        for i in 0..10 {
            wide.fields.push(EntityField::required(
                &format!("f{i}"),
                FieldType::Text,
            ));
        }
        assert_eq!(entity_confidence(&wide), 0.95);
    }

    #[test]
    fn route_confidence_components() {
        let mut r = route();
        assert!((route_confidence(&r) - 0.7).abs() < 1e-9);
        r.body_fields = vec!["title".into()];
        r.segments.push(PathSegment::Param("id".into()));
        assert!((route_confidence(&r) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn overlay_edits_items_without_touching_facts() {
        let mut counter = IdCounter::new();
        let mut analysis = aggregate(
            &mut counter,
            vec![entity()],
            vec![],
            vec![],
            vec![],
            CorrelationReport::default(),
            vec![],
        );

        let mut overlay = ReviewOverlay::new();
        overlay.insert(
            1,
            ReviewDecision {
                enabled: Some(false),
                rename: Some("Todo".into()),
            },
        );
        overlay.insert(99, ReviewDecision::default());
        apply_overlay(&mut analysis, &overlay);

        assert!(!analysis.items[0].enabled);
        assert_eq!(analysis.items[0].display_name, "Todo");
        assert_eq!(analysis.items[0].name, "Task");
        assert_eq!(analysis.entities[0].name, "Task");
    }

    #[test]
    fn analysis_serializes_to_json() {
        let mut counter = IdCounter::new();
        let analysis = aggregate(
            &mut counter,
            vec![entity()],
            vec![],
            vec![],
            vec![],
            CorrelationReport::default(),
            vec!["no route files found".into()],
        );
        let json = analysis.to_json().unwrap();
        assert!(json.contains("\"displayName\": \"Task\""));
        assert!(json.contains("no route files found"));
    }
}
