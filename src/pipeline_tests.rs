//! End-to-end pipeline tests over a realistic fixture project.

use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::aggregate::ItemType;
use crate::discovery::analyze_project;
use crate::emit::{emit_backend, emit_entity, emit_view, render_statement};
use crate::facts::{DataOp, HttpMethod};
use crate::ir::{Operation, Provenance, Statement, Widget};

const TASK_PAGE: &str = r#"
'use client';
import { useState, useEffect } from 'react';

export default function TaskPage() {
  const [tasks, setTasks] = useState<Task[]>([]);
  const [title, setTitle] = useState<string>('');

  useEffect(() => {
    fetch('/api/tasks').then(r => r.json()).then(setTasks);
  }, []);

  const handleAdd = async (e) => {
    e.preventDefault();
    await fetch('/api/tasks', {
      method: 'POST',
      body: JSON.stringify({ title }),
    });
    setTitle('');
  };

  const handleDelete = async (id) => {
    await fetch('/api/tasks/' + id, { method: 'DELETE' });
  };

  return (
    <div className="tasks">
      <h1>Tasks</h1>
      <ul>
        {tasks.map(t => (
          <li key={t.id}>
            {t.title}
            <button onClick={() => handleDelete(t.id)}>Delete</button>
          </li>
        ))}
      </ul>
      <form onSubmit={handleAdd}>
        <input name="title" />
        <button type="submit">Add</button>
      </form>
    </div>
  );
}
"#;

const COLLECTION_ROUTE: &str = r#"
import { NextResponse } from 'next/server';
import { prisma } from '@/lib/prisma';

export async function GET() {
  const tasks = await prisma.task.findMany();
  return NextResponse.json(tasks);
}

export async function POST(req: Request) {
  const { title } = await req.json();
  const task = await prisma.task.create({ data: { title, completed: false } });
  return NextResponse.json(task, { status: 201 });
}
"#;

const ITEM_ROUTE: &str = r#"
import { NextResponse } from 'next/server';
import { prisma } from '@/lib/prisma';

export async function DELETE(req, { params }) {
  await prisma.task.delete({ where: { id: Number(params.id) } });
  return NextResponse.json({ ok: true });
}
"#;

const SCHEMA: &str = r#"
model Task {
  id        Int     @id @default(autoincrement())
  title     String
  completed Boolean @default(false)
}
"#;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn fixture(with_schema: bool) -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "app/tasks/page.tsx", TASK_PAGE);
    write(dir.path(), "app/api/tasks/route.ts", COLLECTION_ROUTE);
    write(dir.path(), "app/api/tasks/[id]/route.ts", ITEM_ROUTE);
    if with_schema {
        write(dir.path(), "prisma/schema.prisma", SCHEMA);
    }
    dir
}

#[test]
fn full_pipeline_with_schema() {
    let dir = fixture(true);
    let analysis = analyze_project(dir.path()).unwrap();

    // Entity from the schema, not the heuristic path.
    let task = analysis.entities.iter().find(|e| e.name == "Task").unwrap();
    assert_eq!(task.provenance, Provenance::Schema);
    assert_eq!(task.fields.len(), 3);

    // One view with a list and a form, bound to Task state.
    let view = analysis.views.iter().find(|v| v.name == "TaskPage").unwrap();
    assert_eq!(view.route_path.as_deref(), Some("/tasks"));
    assert_eq!(view.bindings.len(), 1);
    assert_eq!(view.bindings[0].entity, "Task");
    assert!(view.widgets.iter().any(|w| matches!(w, Widget::List(_))));
    assert!(view.widgets.iter().any(|w| matches!(w, Widget::Form(_))));

    // Three routes extracted.
    assert_eq!(analysis.routes.len(), 3);
    let get = analysis
        .routes
        .iter()
        .find(|r| r.method == HttpMethod::Get)
        .unwrap();
    assert_eq!(get.operation, DataOp::ReadAll);
    assert_eq!(get.model.as_deref(), Some("task"));
    assert_eq!(get.path_text(), "/api/tasks");

    // Every call site correlates; no orphans on either side.
    assert_eq!(analysis.correlation.matches.len(), 3);
    assert!(analysis.correlation.frontend_orphans.is_empty());
    assert!(analysis.correlation.backend_orphans.is_empty());

    // GET /api/tasks against GET /api/tasks is an exact match.
    let best = analysis
        .correlation
        .matches
        .iter()
        .find(|m| m.call.method == HttpMethod::Get)
        .unwrap();
    assert!(best.confidence >= 0.9);

    // Ids are unique within the run.
    let mut ids: Vec<u32> = analysis.items.iter().map(|i| i.id).collect();
    let len = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), len);
    assert!(analysis.items.iter().any(|i| i.item_type == ItemType::Route));
}

#[test]
fn heuristic_entity_without_schema() {
    let dir = fixture(false);
    let analysis = analyze_project(dir.path()).unwrap();

    let task = analysis.entities.iter().find(|e| e.name == "Task").unwrap();
    assert_eq!(task.provenance, Provenance::Heuristic);
    let names: Vec<&str> = task.fields.iter().map(|f| f.name.as_str()).collect();
    assert!(names.contains(&"id"));
    assert!(names.contains(&"title"));
    assert!(task.confidence >= 0.3 && task.confidence < 0.6);
}

#[test]
fn delete_action_translates_to_templated_call() {
    let dir = fixture(true);
    let analysis = analyze_project(dir.path()).unwrap();

    let delete = analysis
        .actions
        .iter()
        .find(|a| a.handler.as_deref() == Some("handleDelete"))
        .unwrap();
    assert_eq!(delete.name, "Delete");
    assert_eq!(
        delete.operations[0],
        Operation::Call {
            method: HttpMethod::Delete,
            path: "/api/tasks/:param".into(),
        }
    );

    let body = delete.body.as_ref().unwrap();
    let mut rendered = String::new();
    render_statement(&body.statements[0], 0, &mut rendered);
    assert_eq!(rendered, "call DELETE \"/api/tasks/:param\"\n");
}

#[test]
fn add_action_tallies_the_prevented_default() {
    let dir = fixture(true);
    let analysis = analyze_project(dir.path()).unwrap();

    let add = analysis
        .actions
        .iter()
        .find(|a| a.handler.as_deref() == Some("handleAdd"))
        .unwrap();
    let body = add.body.as_ref().unwrap();
    assert_eq!(body.skipped.prevent_default, 1);
    assert!(body
        .statements
        .iter()
        .any(|s| matches!(s, Statement::Call { method: HttpMethod::Post, body_fields, .. }
            if body_fields == &vec!["title".to_string()])));
    assert_eq!(body.confidence, 1.0);
}

#[test]
fn emitted_backend_description() {
    let dir = fixture(true);
    let analysis = analyze_project(dir.path()).unwrap();

    let backend = emit_backend(&analysis.entities, &analysis.routes);
    assert!(backend.contains("model Task {"));
    assert!(backend.contains("GET /api/tasks -> db.all(\"task\")"));
    assert!(backend.contains("POST /api/tasks -> db.add(\"task\", { title, completed })"));
    assert!(backend.contains("DELETE /api/tasks/:id -> db.remove(\"task\", id)"));
}

#[test]
fn emitted_entity_and_view_text() {
    let dir = fixture(true);
    let analysis = analyze_project(dir.path()).unwrap();

    let entity_text = emit_entity(&analysis.entities[0]);
    assert!(entity_text.starts_with("entity Task {"));
    assert!(entity_text.contains("completed: boolean required = false"));

    let view_text = emit_view(&analysis.views[0]);
    assert!(view_text.starts_with("view TaskPage page at \"/tasks\" {"));
    assert!(view_text.contains("list of Task from tasks"));
    assert!(view_text.contains("button \"Add\""));
}

#[test]
fn consecutive_runs_restart_ids() {
    let dir = fixture(true);
    let first = analyze_project(dir.path()).unwrap();
    let second = analyze_project(dir.path()).unwrap();
    assert_eq!(
        first.items.iter().map(|i| i.id).collect::<Vec<_>>(),
        second.items.iter().map(|i| i.id).collect::<Vec<_>>()
    );
}
