//! Statement translation into the closed IR.
//!
//! Classifies raw statement text through an ordered rule table, first
//! match wins. Unclassified constructs become `Statement::Raw` so the
//! translation never loses information; known no-ops (debug logging,
//! default-action and propagation suppression) are elided but tallied.
//! Two flavors share the recursive core: the frontend flavor targets
//! handler bodies, the backend flavor additionally recognizes the ORM
//! call vocabulary inside route handlers.

use lazy_static::lazy_static;
use regex::Regex;

use crate::component::extract_body_fields;
use crate::correlate::normalize_call_path;
use crate::facts::HttpMethod;
use crate::ir::{SkipTally, Statement, Translation};
use crate::scan::{balanced_inner, find_balanced, split_statements, split_top_level};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    Frontend,
    Backend,
}

lazy_static! {
    static ref FETCH_RE: Regex = Regex::new(r"\bfetch\s*\(").unwrap();
    static ref METHOD_OPT_RE: Regex =
        Regex::new(r#"method\s*:\s*['"]([A-Za-z]+)['"]"#).unwrap();
    static ref DECL_RE: Regex = Regex::new(
        r"(?s)^(?:const|let|var)\s+(\{[^}]*\}|\[[^\]]*\]|[A-Za-z_$][\w$]*)\s*=\s*(.+)$"
    )
    .unwrap();
    static ref SETTER_CALL_RE: Regex = Regex::new(r"^(set[A-Z][\w$]*)\s*\(").unwrap();
    static ref NAV_CALL_RE: Regex =
        Regex::new(r"^(?:router\.(?:push|replace)|navigate)\s*\(").unwrap();
    static ref LOCATION_ASSIGN_RE: Regex =
        Regex::new(r"^window\.location(?:\.href)?\s*=\s*(.+)$").unwrap();
    static ref DEBUG_LOG_RE: Regex =
        Regex::new(r"^console\.[a-z]+\s*\(").unwrap();
    static ref PREVENT_DEFAULT_RE: Regex =
        Regex::new(r"^[A-Za-z_$][\w$]*\.preventDefault\s*\(\s*\)$").unwrap();
    static ref STOP_PROPAGATION_RE: Regex =
        Regex::new(r"^[A-Za-z_$][\w$]*\.stopPropagation\s*\(\s*\)$").unwrap();
    static ref ASSIGNMENT_RE: Regex = Regex::new(
        r"(?s)^([A-Za-z_$][\w$.]*(?:\[[^\]]*\])?)\s*=\s*([^=>].*)$"
    )
    .unwrap();
    static ref ORM_CALL_RE: Regex =
        Regex::new(r"prisma\.([a-zA-Z_$][\w$]*)\.([a-zA-Z]+)\s*\(").unwrap();
    static ref WHERE_ID_RE: Regex = Regex::new(r"where\s*:\s*\{[^}]*\bid\b").unwrap();
    static ref DATA_OBJECT_RE: Regex = Regex::new(r"data\s*:\s*\{").unwrap();
    static ref RESPONSE_JSON_RE: Regex =
        Regex::new(r"^(?:NextResponse|Response|res)\.json\s*\(").unwrap();
}

/// Translates a frontend handler body.
pub fn translate_frontend(body: &str) -> Translation {
    translate(&split_statements(body), Flavor::Frontend)
}

/// Translates a backend route handler from its pre-split statements.
pub fn translate_backend(statements: &[String]) -> Translation {
    translate(statements, Flavor::Backend)
}

fn translate(statements: &[String], flavor: Flavor) -> Translation {
    let mut tally = SkipTally::default();
    let translated = translate_sequence(statements, flavor, &mut tally);
    let (total, raw) = count_statements(&translated);
    let confidence = if total == 0 {
        1.0
    } else {
        1.0 - raw as f64 / total as f64
    };
    Translation {
        statements: translated,
        skipped: tally,
        confidence,
    }
}

fn translate_sequence(
    statements: &[String],
    flavor: Flavor,
    tally: &mut SkipTally,
) -> Vec<Statement> {
    statements
        .iter()
        .filter_map(|stmt| translate_one(stmt, flavor, tally))
        .collect()
}

fn count_statements(statements: &[Statement]) -> (usize, usize) {
    let mut total = 0;
    let mut raw = 0;
    for stmt in statements {
        total += 1;
        if stmt.is_raw() {
            raw += 1;
        }
        if let Statement::Conditional {
            then_branch,
            else_branch,
            ..
        } = stmt
        {
            let (t, r) = count_statements(then_branch);
            total += t;
            raw += r;
            let (t, r) = count_statements(else_branch);
            total += t;
            raw += r;
        }
    }
    (total, raw)
}

// ═══════════════════════════════════════════════════════════════════════════════
// THE RULE TABLE
// ═══════════════════════════════════════════════════════════════════════════════

fn translate_one(raw_stmt: &str, flavor: Flavor, tally: &mut SkipTally) -> Option<Statement> {
    let stmt = raw_stmt.trim().trim_end_matches(';').trim();
    if stmt.is_empty() {
        return None;
    }

    // Peel a declaration so the rules see the initializer, remembering
    // the bound name for call results.
    let (result_var, expr) = match DECL_RE.captures(stmt) {
        Some(caps) => {
            let binding = caps.get(1).map(|m| m.as_str().trim().to_string());
            (binding, caps.get(2).map_or(stmt, |m| m.as_str()).trim())
        }
        None => (None, stmt),
    };
    let expr_no_await = expr.strip_prefix("await").map(str::trim).unwrap_or(expr);

    // 1. Network call.
    if let Some(call) = translate_fetch(expr_no_await, result_var.clone()) {
        return Some(call);
    }

    // Backend: ORM data access.
    if flavor == Flavor::Backend {
        if let Some(orm) = translate_orm(expr_no_await, result_var.clone()) {
            return Some(orm);
        }
    }

    // 2. State setter call.
    if result_var.is_none() {
        if let Some(caps) = SETTER_CALL_RE.captures(expr_no_await) {
            let setter = &caps[1];
            let open = caps.get(0).unwrap().end() - 1;
            let value = balanced_inner(expr_no_await, open, '(', ')')
                .unwrap_or("")
                .trim()
                .to_string();
            return Some(Statement::Set {
                target: decapitalize(&setter[3..]),
                value,
            });
        }
    }

    // 3. Client navigation.
    if let Some(show) = translate_navigation(expr_no_await) {
        return Some(show);
    }

    // 4. Tallied no-ops.
    if DEBUG_LOG_RE.is_match(expr_no_await) {
        tally.debug_log += 1;
        return None;
    }
    if PREVENT_DEFAULT_RE.is_match(expr_no_await) {
        tally.prevent_default += 1;
        return None;
    }
    if STOP_PROPAGATION_RE.is_match(expr_no_await) {
        tally.stop_propagation += 1;
        return None;
    }

    // 5. Conditional.
    if stmt.starts_with("if")
        && stmt[2..]
            .chars()
            .next()
            .is_none_or(|c| c.is_whitespace() || c == '(')
    {
        if let Some(cond) = translate_conditional(stmt, flavor, tally) {
            return Some(cond);
        }
    }

    // 6. Return.
    if let Some(rest) = stmt.strip_prefix("return") {
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            let value = unwrap_response(rest.trim(), flavor);
            return Some(Statement::Return {
                value: (!value.is_empty()).then_some(value),
            });
        }
    }

    // 7. Declarations and plain assignments become `set`.
    if let Some(target) = result_var {
        return Some(Statement::Set {
            target,
            value: expr.to_string(),
        });
    }
    if let Some(caps) = ASSIGNMENT_RE.captures(stmt) {
        return Some(Statement::Set {
            target: caps[1].to_string(),
            value: caps[2].trim().to_string(),
        });
    }

    // 8. Everything else is preserved verbatim.
    Some(Statement::Raw {
        text: stmt.to_string(),
        reason: "unrecognized statement shape".to_string(),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// INDIVIDUAL RULES
// ═══════════════════════════════════════════════════════════════════════════════

fn translate_fetch(expr: &str, result: Option<String>) -> Option<Statement> {
    let m = FETCH_RE.find(expr)?;
    let open = m.end() - 1;
    let args = balanced_inner(expr, open, '(', ')')?;
    let parts = split_top_level(args, ',');
    let path_text = parts.first()?.trim();
    if path_text.is_empty() {
        return None;
    }

    let mut method = HttpMethod::Get;
    let mut body_fields = Vec::new();
    if let Some(options) = parts.get(1) {
        if let Some(caps) = METHOD_OPT_RE.captures(options) {
            if let Some(parsed) = HttpMethod::parse(&caps[1]) {
                method = parsed;
            }
        }
        body_fields = extract_body_fields(options);
    }

    Some(Statement::Call {
        method,
        path: normalize_call_path(path_text),
        body_fields,
        result,
    })
}

fn translate_navigation(expr: &str) -> Option<Statement> {
    let target = if let Some(m) = NAV_CALL_RE.find(expr) {
        balanced_inner(expr, m.end() - 1, '(', ')')?
            .trim()
            .to_string()
    } else if let Some(caps) = LOCATION_ASSIGN_RE.captures(expr) {
        caps[1].trim().to_string()
    } else {
        return None;
    };
    Some(Statement::Show {
        view: view_name_from_path(&target),
    })
}

/// "/task-list" becomes "TaskList"; the root path becomes "Home".
pub fn view_name_from_path(raw: &str) -> String {
    let path = crate::scan::strip_quotes(raw);
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let name: String = path
        .split('/')
        .filter(|seg| !seg.is_empty())
        .map(|seg| {
            let cleaned: String = seg
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
                .collect();
            cleaned
                .split_whitespace()
                .map(capitalize)
                .collect::<String>()
        })
        .collect();
    if name.is_empty() {
        "Home".to_string()
    } else {
        name
    }
}

fn translate_conditional(stmt: &str, flavor: Flavor, tally: &mut SkipTally) -> Option<Statement> {
    let paren = stmt.find('(')?;
    let paren_end = find_balanced(stmt, paren, '(', ')')?;
    let condition = rewrite_condition(stmt[paren + 1..paren_end - 1].trim());

    let after = stmt[paren_end..].trim_start();
    let after_off = stmt.len() - after.len();
    let (then_text, rest) = if after.starts_with('{') {
        let end = find_balanced(stmt, after_off, '{', '}')?;
        (
            stmt[after_off + 1..end - 1].to_string(),
            stmt[end..].trim_start(),
        )
    } else {
        // Braceless form: the consequent runs to the end.
        (after.to_string(), "")
    };

    let then_branch = translate_sequence(&split_statements(&then_text), flavor, tally);

    let else_branch = if let Some(else_rest) = rest.strip_prefix("else") {
        let else_rest = else_rest.trim_start();
        if else_rest.starts_with('{') {
            let off = stmt.len() - else_rest.len();
            let end = find_balanced(stmt, off, '{', '}')?;
            translate_sequence(
                &split_statements(&stmt[off + 1..end - 1]),
                flavor,
                tally,
            )
        } else {
            // `else if ...` chains recurse as a single nested statement.
            translate_one(else_rest, flavor, tally)
                .into_iter()
                .collect()
        }
    } else {
        Vec::new()
    };

    Some(Statement::Conditional {
        condition,
        then_branch,
        else_branch,
    })
}

/// Fixed operator rewriting table; longest operators first so `===`
/// never decays into `= is `.
const CONDITION_OPERATORS: [(&str, &str); 10] = [
    ("===", " is "),
    ("!==", " is not "),
    ("==", " is "),
    ("!=", " is not "),
    (">=", " is at least "),
    ("<=", " is at most "),
    ("&&", " and "),
    ("||", " or "),
    (">", " is greater than "),
    ("<", " is less than "),
];

pub fn rewrite_condition(raw: &str) -> String {
    let mut text = raw.to_string();
    for (op, replacement) in CONDITION_OPERATORS {
        text = text.replace(op, replacement);
    }
    let text = text.trim();
    let text = if let Some(negated) = text.strip_prefix('!') {
        format!("not {}", negated.trim_start())
    } else {
        text.to_string()
    };
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn translate_orm(expr: &str, result: Option<String>) -> Option<Statement> {
    let caps = ORM_CALL_RE.captures(expr)?;
    let model = caps[1].to_lowercase();
    let op = caps[2].to_string();
    let open = caps.get(0).unwrap().end() - 1;
    let args = balanced_inner(expr, open, '(', ')').unwrap_or("");
    let by_id = WHERE_ID_RE.is_match(args);
    let data_fields = || -> Vec<String> {
        DATA_OBJECT_RE
            .find(args)
            .and_then(|m| balanced_inner(args, m.end() - 1, '{', '}'))
            .map(crate::scan::object_field_names)
            .unwrap_or_default()
    };

    match op.as_str() {
        "findMany" | "findAll" => Some(Statement::Load {
            model,
            one: false,
            by_id: false,
            result,
        }),
        "findUnique" | "findFirst" | "findOne" => Some(Statement::Load {
            model,
            one: true,
            by_id,
            result,
        }),
        "create" => Some(Statement::Add {
            model,
            fields: data_fields(),
        }),
        "update" | "upsert" => Some(Statement::Set {
            target: model,
            value: data_fields().join(", "),
        }),
        "delete" | "deleteMany" => Some(Statement::Remove { model, by_id }),
        _ => None,
    }
}

/// Backend returns unwrap the response-constructor shell so the IR holds
/// the payload expression itself.
fn unwrap_response(value: &str, flavor: Flavor) -> String {
    if flavor == Flavor::Backend {
        if let Some(m) = RESPONSE_JSON_RE.find(value) {
            if let Some(args) = balanced_inner(value, m.end() - 1, '(', ')') {
                return split_top_level(args, ',')
                    .first()
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default();
            }
        }
    }
    value.to_string()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn decapitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fetch_with_concatenated_path_normalizes_to_param() {
        let t = translate_frontend("await fetch('/api/tasks/' + id, { method: 'DELETE' });");
        assert_eq!(t.statements.len(), 1);
        match &t.statements[0] {
            Statement::Call { method, path, .. } => {
                assert_eq!(*method, HttpMethod::Delete);
                assert_eq!(path, "/api/tasks/:param");
            }
            other => panic!("expected call, got {other:?}"),
        }
        assert_eq!(t.confidence, 1.0);
    }

    #[test]
    fn fetch_declaration_records_the_result_variable() {
        let t = translate_frontend(
            "const res = await fetch('/api/tasks', { method: 'POST', body: JSON.stringify({ title }) });",
        );
        match &t.statements[0] {
            Statement::Call {
                method,
                path,
                body_fields,
                result,
            } => {
                assert_eq!(*method, HttpMethod::Post);
                assert_eq!(path, "/api/tasks");
                assert_eq!(body_fields, &vec!["title".to_string()]);
                assert_eq!(result.as_deref(), Some("res"));
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn setter_call_becomes_set() {
        let t = translate_frontend("setTitle('');");
        assert_eq!(
            t.statements[0],
            Statement::Set {
                target: "title".into(),
                value: "''".into(),
            }
        );
    }

    #[test]
    fn navigation_becomes_show() {
        let t = translate_frontend("router.push('/task-list');");
        assert_eq!(
            t.statements[0],
            Statement::Show {
                view: "TaskList".into()
            }
        );

        let t = translate_frontend("router.push('/');");
        assert_eq!(t.statements[0], Statement::Show { view: "Home".into() });
    }

    #[test]
    fn noops_are_elided_but_tallied() {
        let t = translate_frontend("e.preventDefault();\nconsole.log('adding');\nsetBusy(true);");
        assert_eq!(t.statements.len(), 1);
        assert_eq!(t.skipped.prevent_default, 1);
        assert_eq!(t.skipped.debug_log, 1);
        assert_eq!(t.skipped.total(), 2);
        assert_eq!(t.confidence, 1.0);
    }

    #[test]
    fn all_noop_body_has_full_confidence() {
        let t = translate_frontend("console.log('x');");
        assert!(t.statements.is_empty());
        assert_eq!(t.confidence, 1.0);
    }

    #[test]
    fn conditional_rewrites_operators_and_recurses() {
        let body = "if (!title && count >= 1) {\n  setError('empty');\n} else {\n  submit();\n}";
        let t = translate_frontend(body);
        match &t.statements[0] {
            Statement::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                assert_eq!(condition, "not title and count is at least 1");
                assert_eq!(
                    then_branch[0],
                    Statement::Set {
                        target: "error".into(),
                        value: "'empty'".into(),
                    }
                );
                assert!(else_branch[0].is_raw());
            }
            other => panic!("expected conditional, got {other:?}"),
        }
    }

    #[test]
    fn condition_rewriting_table() {
        assert_eq!(rewrite_condition("a === b"), "a is b");
        assert_eq!(rewrite_condition("a !== b"), "a is not b");
        assert_eq!(rewrite_condition("a > 3 || b < 2"), "a is greater than 3 or b is less than 2");
        assert_eq!(rewrite_condition("!done"), "not done");
    }

    #[test]
    fn declarations_and_assignments_become_set() {
        let t = translate_frontend("const next = tasks.length + 1;\ntotal = next * 2;");
        assert_eq!(
            t.statements[0],
            Statement::Set {
                target: "next".into(),
                value: "tasks.length + 1".into(),
            }
        );
        assert_eq!(
            t.statements[1],
            Statement::Set {
                target: "total".into(),
                value: "next * 2".into(),
            }
        );
    }

    #[test]
    fn unrecognized_statements_are_preserved_raw() {
        let t = translate_frontend("weird ??= thing!;");
        assert_eq!(t.statements.len(), 1);
        assert!(t.statements[0].is_raw());
        assert_eq!(t.confidence, 0.0);
    }

    #[test]
    fn statement_count_is_preserved_modulo_tally() {
        let body = "e.preventDefault();\nconst a = 1;\nconsole.log(a);\nweird!!;\nsetA(a);";
        let t = translate_frontend(body);
        assert_eq!(t.statements.len() + t.skipped.total(), 5);
    }

    #[test]
    fn backend_orm_calls_map_to_data_statements() {
        let stmts = vec![
            "const tasks = await prisma.task.findMany()".to_string(),
            "const task = await prisma.task.findUnique({ where: { id: Number(params.id) } })"
                .to_string(),
            "await prisma.task.create({ data: { title, completed: false } })".to_string(),
            "await prisma.task.delete({ where: { id } })".to_string(),
            "return NextResponse.json(tasks)".to_string(),
        ];
        let t = translate_backend(&stmts);
        assert_eq!(
            t.statements[0],
            Statement::Load {
                model: "task".into(),
                one: false,
                by_id: false,
                result: Some("tasks".into()),
            }
        );
        assert_eq!(
            t.statements[1],
            Statement::Load {
                model: "task".into(),
                one: true,
                by_id: true,
                result: Some("task".into()),
            }
        );
        assert_eq!(
            t.statements[2],
            Statement::Add {
                model: "task".into(),
                fields: vec!["title".into(), "completed".into()],
            }
        );
        assert_eq!(
            t.statements[3],
            Statement::Remove {
                model: "task".into(),
                by_id: true,
            }
        );
        assert_eq!(
            t.statements[4],
            Statement::Return {
                value: Some("tasks".into()),
            }
        );
        assert_eq!(t.confidence, 1.0);
    }

    #[test]
    fn backend_update_lowers_to_set() {
        let stmts =
            vec!["await prisma.task.update({ where: { id }, data: { completed } })".to_string()];
        let t = translate_backend(&stmts);
        assert_eq!(
            t.statements[0],
            Statement::Set {
                target: "task".into(),
                value: "completed".into(),
            }
        );
    }
}
