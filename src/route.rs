//! Analysis of backend route handler files.
//!
//! A route file declares exported functions named after HTTP methods.
//! Each exported handler becomes one RouteFact: the URL template comes
//! from the file's directory path, the data operation and model from
//! ORM-style calls in the handler body, and the accepted body fields
//! from request-parsing statements.

use lazy_static::lazy_static;
use regex::Regex;

use crate::facts::{DataOp, HttpMethod, PathSegment, RouteFact};
use crate::scan::{balanced_inner, object_field_names, split_statements};

lazy_static! {
    static ref EXPORT_HANDLER_RE: Regex = Regex::new(
        r"export\s+(?:async\s+)?function\s+(GET|POST|PUT|PATCH|DELETE)\s*\([^)]*\)\s*\{"
    )
    .unwrap();
    static ref ORM_CALL_RE: Regex =
        Regex::new(r"prisma\.([a-zA-Z_$][\w$]*)\.([a-zA-Z]+)\s*\(").unwrap();
    static ref STATUS_RE: Regex = Regex::new(r"status\s*:\s*(\d{3})").unwrap();
    static ref JSON_PARSE_RE: Regex = Regex::new(
        r"(?:const|let|var)\s*(\{[^}]*\}|[A-Za-z_$][\w$]*)\s*=\s*await\s+(?:req|request)\s*\.\s*json\s*\(\s*\)"
    )
    .unwrap();
    static ref DATA_OBJECT_RE: Regex = Regex::new(r"data\s*:\s*\{").unwrap();
}

/// True when the file name matches the fixed route-module convention.
pub fn is_route_file(path: &str) -> bool {
    let normalized = path.replace('\\', "/");
    let Some(file) = normalized.rsplit('/').next() else {
        return false;
    };
    matches!(file, "route.ts" | "route.js" | "route.tsx" | "route.jsx")
}

/// Analyzes one route file into a fact per exported method handler.
/// Files exporting no recognized handler produce an empty vec, which the
/// discovery layer surfaces as a warning rather than an error.
pub fn analyze_route(path: &str, source: &str) -> Vec<RouteFact> {
    let segments = path_segments(path);
    let mut routes = Vec::new();

    for caps in EXPORT_HANDLER_RE.captures_iter(source) {
        let Some(method) = HttpMethod::parse(&caps[1]) else {
            continue;
        };
        let open = caps.get(0).unwrap().end() - 1;
        let body = balanced_inner(source, open, '{', '}').unwrap_or("");
        let statements = split_statements(body);

        let (operation, model) = detect_operation(body);
        let body_fields = detect_body_fields(body);
        let status = STATUS_RE
            .captures(body)
            .and_then(|c| c[1].parse::<u16>().ok());

        routes.push(RouteFact {
            method,
            segments: segments.clone(),
            operation,
            model,
            body_fields,
            statements,
            status,
            file_path: path.to_string(),
        });
    }

    routes
}

// ═══════════════════════════════════════════════════════════════════════════════
// PATH TEMPLATE
// ═══════════════════════════════════════════════════════════════════════════════

/// URL segments from the directory components between the route tree
/// root (`app/` or `pages/api`) and the route file itself. Bracketed
/// directories become parameters.
pub fn path_segments(path: &str) -> Vec<PathSegment> {
    let normalized = path.replace('\\', "/");
    let parts: Vec<&str> = normalized.split('/').filter(|p| !p.is_empty()).collect();

    // Drop everything up to and including the route tree root, and the
    // file name at the end.
    let start = parts
        .iter()
        .position(|p| *p == "app" || *p == "pages")
        .map(|i| i + 1)
        .unwrap_or(0);
    let end = parts.len().saturating_sub(1);

    parts[start..end]
        .iter()
        .filter_map(|part| parse_segment(part))
        .collect()
}

fn parse_segment(part: &str) -> Option<PathSegment> {
    // Route groups `(group)` contribute nothing to the URL.
    if part.starts_with('(') && part.ends_with(')') {
        return None;
    }
    if let Some(inner) = part.strip_prefix('[').and_then(|p| p.strip_suffix(']')) {
        if let Some(inner) = inner.strip_prefix('[').and_then(|p| p.strip_suffix(']')) {
            let name = inner.strip_prefix("...").unwrap_or(inner);
            return Some(PathSegment::OptionalCatchAll(name.to_string()));
        }
        if let Some(name) = inner.strip_prefix("...") {
            return Some(PathSegment::CatchAll(name.to_string()));
        }
        return Some(PathSegment::Param(inner.to_string()));
    }
    Some(PathSegment::Literal(part.to_string()))
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPERATION DETECTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Maps the first ORM call in the handler body to a data operation.
/// Handlers with no recognized ORM call keep an empty operation; they
/// may not touch the database at all, so nothing is inferred from the
/// method alone.
fn detect_operation(body: &str) -> (DataOp, Option<String>) {
    for caps in ORM_CALL_RE.captures_iter(body) {
        let model = caps[1].to_lowercase();
        let op = match &caps[2] {
            "findMany" | "findAll" => DataOp::ReadAll,
            "findUnique" | "findFirst" | "findOne" => DataOp::ReadOne,
            "create" => DataOp::Create,
            "update" | "upsert" => DataOp::Update,
            "delete" | "deleteMany" => DataOp::Delete,
            _ => continue,
        };
        return (op, Some(model));
    }
    (DataOp::None, None)
}

/// Body field names, preferring the ORM `data: { ... }` object over the
/// request-body destructure pattern.
fn detect_body_fields(body: &str) -> Vec<String> {
    if let Some(m) = DATA_OBJECT_RE.find(body) {
        let open = m.end() - 1;
        if let Some(inner) = balanced_inner(body, open, '{', '}') {
            let fields = object_field_names(inner);
            if !fields.is_empty() {
                return fields;
            }
        }
    }

    if let Some(caps) = JSON_PARSE_RE.captures(body) {
        let binding = caps[1].trim();
        if binding.starts_with('{') {
            if let Some(inner) = balanced_inner(binding, 0, '{', '}') {
                return object_field_names(inner);
            }
        }
    }

    Vec::new()
}
