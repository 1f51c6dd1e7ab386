//! DSL text rendering for entities, views, actions, and the generated
//! backend description.
//!
//! Emission runs only after external review of the aggregated model.
//! Rendering is total: every IR variant has a textual form, including
//! raw statements, which are quoted verbatim.

use std::fmt::Write;

use crate::facts::{DataOp, RouteFact};
use crate::ir::{Action, Cardinality, Entity, FieldType, Operation, Statement, View, Widget};

const INDENT: &str = "  ";

// ═══════════════════════════════════════════════════════════════════════════════
// ENTITIES
// ═══════════════════════════════════════════════════════════════════════════════

pub fn emit_entity(entity: &Entity) -> String {
    let mut out = format!("entity {} {{\n", entity.name);
    for field in &entity.fields {
        let mut line = format!("{INDENT}{}: {}", field.name, field.field_type.as_str());
        if field.required {
            line.push_str(" required");
        }
        if let Some(default) = &field.default {
            let _ = write!(line, " = {default}");
        }
        out.push_str(&line);
        out.push('\n');
    }
    for relation in &entity.relations {
        let cardinality = match relation.cardinality {
            Cardinality::One => "one",
            Cardinality::Many => "many",
        };
        let _ = writeln!(
            out,
            "{INDENT}{} -> {} ({cardinality})",
            relation.name, relation.target
        );
    }
    out.push_str("}\n");
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// VIEWS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn emit_view(view: &View) -> String {
    let mut out = format!("view {}", view.name);
    match &view.route_path {
        Some(path) => {
            let _ = write!(out, " page at \"{path}\"");
        }
        None => out.push_str(" component"),
    }
    out.push_str(" {\n");
    for widget in &view.widgets {
        render_widget(widget, 1, &mut out);
    }
    out.push_str("}\n");
    out
}

fn render_widget(widget: &Widget, depth: usize, out: &mut String) {
    let pad = INDENT.repeat(depth);
    match widget {
        Widget::Button(b) => {
            let mut line = format!("{pad}button \"{}\"", b.label);
            if let Some(action) = &b.action {
                let _ = write!(line, " -> {action}");
            }
            out.push_str(&line);
            out.push('\n');
        }
        Widget::Form(f) => {
            let mut line = format!("{pad}form");
            if let Some(entity) = &f.entity {
                let _ = write!(line, " for {entity}");
            }
            if let Some(action) = &f.action {
                let _ = write!(line, " -> {action}");
            }
            out.push_str(&line);
            out.push_str(" {\n");
            for child in &f.children {
                render_widget(child, depth + 1, out);
            }
            let _ = writeln!(out, "{pad}}}");
        }
        Widget::List(l) => {
            let mut line = format!("{pad}list");
            if let Some(entity) = &l.entity {
                let _ = write!(line, " of {entity}");
            }
            if let Some(source) = &l.source {
                let _ = write!(line, " from {source}");
            }
            out.push_str(&line);
            if l.children.is_empty() {
                out.push('\n');
            } else {
                out.push_str(" {\n");
                for child in &l.children {
                    render_widget(child, depth + 1, out);
                }
                let _ = writeln!(out, "{pad}}}");
            }
        }
        Widget::Input(i) => {
            let mut line = format!("{pad}input");
            if let Some(name) = &i.name {
                let _ = write!(line, " {name}");
            }
            if i.input_type != "text" {
                let _ = write!(line, " ({})", i.input_type);
            }
            out.push_str(&line);
            out.push('\n');
        }
        Widget::Text(t) => {
            let _ = writeln!(out, "{pad}text \"{}\"", t.content);
        }
        Widget::Link(l) => {
            let mut line = format!("{pad}link \"{}\"", l.label);
            if let Some(to) = &l.to {
                let _ = write!(line, " -> \"{to}\"");
            }
            out.push_str(&line);
            out.push('\n');
        }
        Widget::Container(c) => {
            let _ = writeln!(out, "{pad}container {{");
            for child in &c.children {
                render_widget(child, depth + 1, out);
            }
            let _ = writeln!(out, "{pad}}}");
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ACTIONS & STATEMENTS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn emit_action(action: &Action) -> String {
    let mut out = format!("action {} on {}", action.name, action.trigger);
    if !action.params.is_empty() {
        let _ = write!(out, " ({})", action.params.join(", "));
    }
    out.push_str(" {\n");

    // A full translation takes rendering precedence over the operation
    // list, which exists for correlation.
    match &action.body {
        Some(translation) if !translation.statements.is_empty() => {
            for statement in &translation.statements {
                render_statement(statement, 1, &mut out);
            }
        }
        _ => {
            for operation in &action.operations {
                let _ = writeln!(out, "{INDENT}{}", render_operation(operation));
            }
        }
    }
    out.push_str("}\n");
    out
}

/// One line of DSL per statement; conditionals open nested blocks.
pub fn render_statement(statement: &Statement, depth: usize, out: &mut String) {
    let pad = INDENT.repeat(depth);
    match statement {
        Statement::Call {
            method,
            path,
            body_fields,
            ..
        } => {
            let mut line = format!("{pad}call {method} \"{path}\"");
            if !body_fields.is_empty() {
                let _ = write!(line, " with {{ {} }}", body_fields.join(", "));
            }
            out.push_str(&line);
            out.push('\n');
        }
        Statement::Load {
            model, one, by_id, ..
        } => {
            let mut line = format!("{pad}load ");
            if *one {
                line.push_str("one ");
            }
            line.push_str(model);
            if *by_id {
                line.push_str(" by id");
            }
            out.push_str(&line);
            out.push('\n');
        }
        Statement::Set { target, value } => {
            let _ = writeln!(out, "{pad}set {target} to {value}");
        }
        Statement::Conditional {
            condition,
            then_branch,
            else_branch,
        } => {
            let _ = writeln!(out, "{pad}if {condition} {{");
            for stmt in then_branch {
                render_statement(stmt, depth + 1, out);
            }
            if else_branch.is_empty() {
                let _ = writeln!(out, "{pad}}}");
            } else {
                let _ = writeln!(out, "{pad}}} else {{");
                for stmt in else_branch {
                    render_statement(stmt, depth + 1, out);
                }
                let _ = writeln!(out, "{pad}}}");
            }
        }
        Statement::Return { value } => match value {
            Some(value) => {
                let _ = writeln!(out, "{pad}return {value}");
            }
            None => {
                let _ = writeln!(out, "{pad}return");
            }
        },
        Statement::Add { model, fields } => {
            let mut line = format!("{pad}add {model}");
            if !fields.is_empty() {
                let _ = write!(line, " with {{ {} }}", fields.join(", "));
            }
            out.push_str(&line);
            out.push('\n');
        }
        Statement::Remove { model, by_id } => {
            let mut line = format!("{pad}remove {model}");
            if *by_id {
                line.push_str(" by id");
            }
            out.push_str(&line);
            out.push('\n');
        }
        Statement::Show { view } => {
            let _ = writeln!(out, "{pad}show {view}");
        }
        Statement::Raw { text, .. } => {
            let _ = writeln!(out, "{pad}raw `{text}`");
        }
    }
}

fn render_operation(operation: &Operation) -> String {
    let with_entity = |verb: &str, entity: &Option<String>| match entity {
        Some(entity) => format!("{verb} {entity}"),
        None => verb.to_string(),
    };
    match operation {
        Operation::Add { entity } => with_entity("add", entity),
        Operation::Update { entity } => with_entity("update", entity),
        Operation::Remove { entity } => with_entity("remove", entity),
        Operation::Load { entity } => with_entity("load", entity),
        Operation::Call { method, path } => format!("call {method} \"{path}\""),
        Operation::Show { view } => format!("show {view}"),
        Operation::Set { target } => format!("set {target}"),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BACKEND DESCRIPTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Fixed primitive-to-backend type mapping.
fn backend_type(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Number => "Int",
        FieldType::Text => "String",
        FieldType::Boolean => "Boolean",
        FieldType::Date | FieldType::Datetime | FieldType::Time => "DateTime",
        FieldType::Object => "Json",
    }
}

/// Renders the single generated backend description: a header comment,
/// one model block per entity, one endpoint line per route.
pub fn emit_backend(entities: &[Entity], routes: &[RouteFact]) -> String {
    let mut out = String::from("# generated backend description\n\n");

    for entity in entities {
        let _ = writeln!(out, "model {} {{", entity.name);
        for field in &entity.fields {
            let _ = writeln!(out, "{INDENT}{}: {}", field.name, backend_type(field.field_type));
        }
        out.push_str("}\n\n");
    }

    for route in routes {
        let _ = writeln!(
            out,
            "{} {} -> {}",
            route.method,
            route.path_text(),
            render_endpoint(route)
        );
    }
    out
}

fn render_endpoint(route: &RouteFact) -> String {
    let model = route.model.as_deref().unwrap_or("unknown");
    let fields = route.body_fields.join(", ");
    match route.operation {
        DataOp::ReadAll => format!("db.all(\"{model}\")"),
        DataOp::ReadOne => format!("db.get(\"{model}\", id)"),
        DataOp::Create => format!("db.add(\"{model}\", {{ {fields} }})"),
        DataOp::Update => format!("db.update(\"{model}\", id, {{ {fields} }})"),
        DataOp::Delete => format!("db.remove(\"{model}\", id)"),
        DataOp::None => "custom()".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{HttpMethod, PathSegment};
    use crate::ir::{
        ButtonWidget, EntityField, ListWidget, Provenance, Relation, TextWidget,
    };
    use crate::translate::translate_frontend;
    use pretty_assertions::assert_eq;

    fn task_entity() -> Entity {
        Entity {
            name: "Task".into(),
            fields: vec![
                EntityField::required("id", FieldType::Number),
                EntityField::required("title", FieldType::Text),
                EntityField {
                    name: "completed".into(),
                    field_type: FieldType::Boolean,
                    required: true,
                    default: Some("false".into()),
                },
            ],
            relations: vec![Relation {
                name: "owner".into(),
                target: "User".into(),
                cardinality: Cardinality::One,
            }],
            provenance: Provenance::Schema,
            confidence: 0.9,
        }
    }

    #[test]
    fn entity_rendering() {
        let text = emit_entity(&task_entity());
        assert_eq!(
            text,
            "entity Task {\n  id: number required\n  title: text required\n  completed: boolean required = false\n  owner -> User (one)\n}\n"
        );
    }

    #[test]
    fn view_rendering() {
        let view = View {
            name: "TaskPage".into(),
            kind: crate::facts::ComponentKind::Page,
            route_path: Some("/tasks".into()),
            widgets: vec![
                Widget::Text(TextWidget {
                    content: "Tasks".into(),
                }),
                Widget::List(ListWidget {
                    entity: Some("Task".into()),
                    source: Some("tasks".into()),
                    children: vec![Widget::Button(ButtonWidget {
                        label: "Delete".into(),
                        action: Some("Delete".into()),
                    })],
                }),
            ],
            bindings: vec![],
        };
        let text = emit_view(&view);
        assert!(text.starts_with("view TaskPage page at \"/tasks\" {\n"));
        assert!(text.contains("  text \"Tasks\"\n"));
        assert!(text.contains("  list of Task from tasks {\n"));
        assert!(text.contains("    button \"Delete\" -> Delete\n"));
    }

    #[test]
    fn translated_fetch_round_trips_method_path_and_body() {
        let translation = translate_frontend(
            "await fetch('/api/tasks', { method: 'POST', body: JSON.stringify({ title }) });",
        );
        let mut out = String::new();
        render_statement(&translation.statements[0], 0, &mut out);
        assert_eq!(out, "call POST \"/api/tasks\" with { title }\n");
    }

    #[test]
    fn delete_with_param_path_renders_scenario_form() {
        let translation =
            translate_frontend("await fetch('/api/tasks/' + id, { method: 'DELETE' });");
        let mut out = String::new();
        render_statement(&translation.statements[0], 0, &mut out);
        assert_eq!(out, "call DELETE \"/api/tasks/:param\"\n");
    }

    #[test]
    fn action_body_takes_precedence_over_operations() {
        let action = Action {
            name: "Add".into(),
            trigger: "submit".into(),
            params: vec!["title".into()],
            operations: vec![Operation::Add {
                entity: Some("Task".into()),
            }],
            body: Some(translate_frontend("setBusy(true);")),
            handler: Some("handleAdd".into()),
        };
        let text = emit_action(&action);
        assert_eq!(
            text,
            "action Add on submit (title) {\n  set busy to true\n}\n"
        );
    }

    #[test]
    fn backend_description_scenario() {
        let routes = vec![
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
            },
            RouteFact {
                method: HttpMethod::Delete,
                segments: vec![
                    PathSegment::Literal("api".into()),
                    PathSegment::Literal("tasks".into()),
                    PathSegment::Param("id".into()),
                ],
                operation: DataOp::Delete,
                model: Some("task".into()),
                body_fields: vec![],
                statements: vec![],
                status: None,
                file_path: "app/api/tasks/[id]/route.ts".into(),
            },
            RouteFact {
                method: HttpMethod::Get,
                segments: vec![
                    PathSegment::Literal("api".into()),
                    PathSegment::Literal("health".into()),
                ],
                operation: DataOp::None,
                model: None,
                body_fields: vec![],
                statements: vec![],
                status: None,
                file_path: "app/api/health/route.ts".into(),
            },
        ];
        let text = emit_backend(&[task_entity()], &routes);
        assert!(text.starts_with("# generated backend description\n"));
        assert!(text.contains("model Task {\n  id: Int\n  title: String\n  completed: Boolean\n}"));
        assert!(text.contains("GET /api/tasks -> db.all(\"task\")\n"));
        assert!(text.contains("DELETE /api/tasks/:id -> db.remove(\"task\", id)\n"));
        assert!(text.contains("GET /api/health -> custom()\n"));
    }

    #[test]
    fn conditional_statement_rendering() {
        let translation = translate_frontend(
            "if (!title) {\n  setError('empty');\n} else {\n  setError('');\n}",
        );
        let mut out = String::new();
        render_statement(&translation.statements[0], 0, &mut out);
        assert_eq!(
            out,
            "if not title {\n  set error to 'empty'\n} else {\n  set error to ''\n}\n"
        );
    }
}
