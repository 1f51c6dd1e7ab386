//! Frontend-to-backend call correlation.
//!
//! Every call site is scored against every route; the best-scoring route
//! wins, ties resolving to the first-encountered route. Scoring is 0
//! unless the method matches and the path template matches, then 0.7
//! base, +0.2 for an exact literal match (zero parameter substitutions),
//! +0.1 when a mutating call hits a route that declares body fields.

use crate::facts::{CallSite, ComponentFact, PathSegment, RouteFact};
use crate::ir::{CorrelationMatch, CorrelationReport};
use crate::scan::{find_balanced, is_quoted, split_top_level, strip_quotes};

/// Correlates all observed call sites against the route set.
pub fn correlate(components: &[ComponentFact], routes: &[RouteFact]) -> CorrelationReport {
    let mut report = CorrelationReport::default();
    let mut matched_routes = vec![false; routes.len()];
    let mut total_calls = 0usize;
    let mut score_sum = 0.0;

    for component in components {
        for call in &component.calls {
            total_calls += 1;
            let mut best: Option<(usize, f64)> = None;
            for (index, route) in routes.iter().enumerate() {
                let score = score_call(call, route);
                if score > 0.0 && best.map_or(true, |(_, s)| score > s) {
                    best = Some((index, score));
                }
            }

            match best {
                Some((index, score)) => {
                    matched_routes[index] = true;
                    score_sum += score;
                    let route = &routes[index];
                    let mut warnings = Vec::new();
                    if !call.body_fields.is_empty() && route.body_fields.is_empty() {
                        warnings.push(format!(
                            "call from {} sends body fields the route does not declare",
                            component.name
                        ));
                    }
                    report.matches.push(CorrelationMatch {
                        component: component.name.clone(),
                        call: call.clone(),
                        route: Some(route.clone()),
                        confidence: score,
                        warnings,
                    });
                }
                None => report.frontend_orphans.push(call.clone()),
            }
        }
    }

    for (index, route) in routes.iter().enumerate() {
        if !matched_routes[index] {
            report.backend_orphans.push(route.clone());
        }
    }

    report.confidence = if total_calls == 0 {
        1.0
    } else {
        score_sum / total_calls as f64
    };
    report
}

/// Scores one call against one route.
pub fn score_call(call: &CallSite, route: &RouteFact) -> f64 {
    if call.method != route.method {
        return 0.0;
    }
    let path = normalize_call_path(&call.path);
    let Some(substitutions) = match_path(&path, &route.segments) else {
        return 0.0;
    };
    let exact = substitutions == 0;
    let body = call.method.is_mutating() && !route.body_fields.is_empty();
    // Fixed score table rather than summed bonuses, so the exact-match
    // guarantee holds bit-for-bit in f64.
    match (exact, body) {
        (false, false) => 0.7,
        (false, true) => 0.8,
        (true, false) => 0.9,
        (true, true) => 1.0,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PATH NORMALIZATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Normalizes raw call-path text to a comparable template: quotes and
/// backticks stripped, template interpolations and concatenated
/// expressions collapsed to `:param`, query string dropped, trailing
/// slash stripped, leading slash enforced.
pub fn normalize_call_path(raw: &str) -> String {
    let mut joined = String::new();
    for piece in split_top_level(raw.trim(), '+') {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        if is_quoted(piece) {
            joined.push_str(&replace_interpolations(strip_quotes(piece)));
        } else {
            joined.push_str(":param");
        }
    }

    let path = joined.split(['?', '#']).next().unwrap_or("");
    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|seg| if seg.contains(":param") { ":param" } else { seg })
        .collect();

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

fn replace_interpolations(text: &str) -> String {
    let mut out = String::new();
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        match find_balanced(rest, start + 1, '{', '}') {
            Some(end) => {
                out.push_str(":param");
                rest = &rest[end..];
            }
            None => {
                out.push_str(":param");
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE MATCHING
// ═══════════════════════════════════════════════════════════════════════════════

/// Matches a normalized call path against a route template. Returns the
/// number of parameter substitutions the match required, or None on any
/// mismatch. A catch-all consumes all remaining segments and ends the
/// comparison.
pub fn match_path(call_path: &str, template: &[PathSegment]) -> Option<usize> {
    let call_segments: Vec<&str> = call_path.split('/').filter(|s| !s.is_empty()).collect();
    let mut substitutions = 0usize;
    let mut position = 0usize;

    for segment in template {
        match segment {
            PathSegment::Literal(literal) => {
                if call_segments.get(position) != Some(&literal.as_str()) {
                    return None;
                }
                position += 1;
            }
            PathSegment::Param(_) => {
                call_segments.get(position)?;
                substitutions += 1;
                position += 1;
            }
            PathSegment::CatchAll(_) => {
                call_segments.get(position)?;
                return Some(substitutions + 1);
            }
            PathSegment::OptionalCatchAll(_) => {
                if position < call_segments.len() {
                    substitutions += 1;
                }
                return Some(substitutions);
            }
        }
    }

    (position == call_segments.len()).then_some(substitutions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{ComponentKind, DataOp, HttpMethod};
    use pretty_assertions::assert_eq;

    fn route(method: HttpMethod, segments: Vec<PathSegment>, body_fields: Vec<&str>) -> RouteFact {
        RouteFact {
            method,
            segments,
            operation: DataOp::None,
            model: None,
            body_fields: body_fields.into_iter().map(String::from).collect(),
            statements: vec![],
            status: None,
            file_path: "app/api/route.ts".into(),
        }
    }

    fn tasks_collection(method: HttpMethod, body_fields: Vec<&str>) -> RouteFact {
        route(
            method,
            vec![
                PathSegment::Literal("api".into()),
                PathSegment::Literal("tasks".into()),
            ],
            body_fields,
        )
    }

    fn tasks_item(method: HttpMethod) -> RouteFact {
        route(
            method,
            vec![
                PathSegment::Literal("api".into()),
                PathSegment::Literal("tasks".into()),
                PathSegment::Param("id".into()),
            ],
            vec![],
        )
    }

    fn call(method: HttpMethod, path: &str) -> CallSite {
        CallSite {
            method,
            path: path.into(),
            body_fields: vec![],
        }
    }

    fn component(calls: Vec<CallSite>) -> ComponentFact {
        ComponentFact {
            name: "TaskPage".into(),
            kind: ComponentKind::Page,
            file_path: "app/tasks/page.tsx".into(),
            props: vec![],
            state: vec![],
            jsx: None,
            handlers: vec![],
            calls,
            effects: vec![],
        }
    }

    #[test]
    fn path_normalization_collapses_dynamic_pieces() {
        assert_eq!(normalize_call_path("'/api/tasks'"), "/api/tasks");
        assert_eq!(normalize_call_path("'/api/tasks/' + id"), "/api/tasks/:param");
        assert_eq!(normalize_call_path("`/api/tasks/${task.id}`"), "/api/tasks/:param");
        assert_eq!(normalize_call_path("'/api/tasks/'"), "/api/tasks");
        assert_eq!(normalize_call_path("'/api/tasks?done=1'"), "/api/tasks");
        assert_eq!(normalize_call_path("''"), "/");
    }

    #[test]
    fn exact_match_scores_point_nine() {
        let score = score_call(
            &call(HttpMethod::Get, "'/api/tasks'"),
            &tasks_collection(HttpMethod::Get, vec![]),
        );
        assert_eq!(score, 0.9);
    }

    #[test]
    fn parameter_substitution_drops_the_exact_bonus() {
        let score = score_call(
            &call(HttpMethod::Delete, "'/api/tasks/' + id"),
            &tasks_item(HttpMethod::Delete),
        );
        assert_eq!(score, 0.7);
    }

    #[test]
    fn mutating_call_with_declared_body_gets_the_body_bonus() {
        let mut post = call(HttpMethod::Post, "'/api/tasks'");
        post.body_fields = vec!["title".into()];
        let score = score_call(&post, &tasks_collection(HttpMethod::Post, vec!["title"]));
        assert_eq!(score, 1.0);
    }

    #[test]
    fn substituted_mutating_call_with_body_scores_point_eight() {
        let mut put = call(HttpMethod::Put, "'/api/tasks/' + id");
        put.body_fields = vec!["title".into()];
        let mut item = tasks_item(HttpMethod::Put);
        item.body_fields = vec!["title".into()];
        assert_eq!(score_call(&put, &item), 0.8);
    }

    #[test]
    fn method_mismatch_is_no_match() {
        let score = score_call(
            &call(HttpMethod::Post, "'/api/tasks'"),
            &tasks_collection(HttpMethod::Get, vec![]),
        );
        assert_eq!(score, 0.0);
    }

    #[test]
    fn template_matching_is_reflexive_over_substituted_params() {
        let item = tasks_item(HttpMethod::Get);
        assert_eq!(match_path("/api/tasks/42", &item.segments), Some(1));
        assert_eq!(match_path("/api/tasks/:param", &item.segments), Some(1));
        assert_eq!(match_path("/api/tasks", &item.segments), None);
        assert_eq!(match_path("/api/tasks/42/extra", &item.segments), None);
    }

    #[test]
    fn catch_all_consumes_the_rest() {
        let docs = route(
            HttpMethod::Get,
            vec![
                PathSegment::Literal("api".into()),
                PathSegment::CatchAll("slug".into()),
            ],
            vec![],
        );
        assert_eq!(match_path("/api/a/b/c", &docs.segments), Some(1));
        assert_eq!(match_path("/api", &docs.segments), None);

        let optional = route(
            HttpMethod::Get,
            vec![
                PathSegment::Literal("api".into()),
                PathSegment::OptionalCatchAll("slug".into()),
            ],
            vec![],
        );
        assert_eq!(match_path("/api", &optional.segments), Some(0));
        assert_eq!(match_path("/api/a/b", &optional.segments), Some(1));
    }

    #[test]
    fn report_collects_matches_and_orphans() {
        let routes = vec![
            tasks_collection(HttpMethod::Get, vec![]),
            tasks_item(HttpMethod::Delete),
            tasks_collection(HttpMethod::Put, vec![]),
        ];
        let components = vec![component(vec![
            call(HttpMethod::Get, "'/api/tasks'"),
            call(HttpMethod::Delete, "'/api/tasks/' + id"),
            call(HttpMethod::Get, "'/api/unknown'"),
        ])];

        let report = correlate(&components, &routes);
        assert_eq!(report.matches.len(), 2);
        assert_eq!(report.frontend_orphans.len(), 1);
        assert_eq!(report.backend_orphans.len(), 1);
        assert_eq!(report.backend_orphans[0].method, HttpMethod::Put);

        // (0.9 + 0.7 + 0.0) / 3
        let expected = (0.9 + 0.7) / 3.0;
        assert!((report.confidence - expected).abs() < 1e-9);
    }

    #[test]
    fn no_calls_means_full_confidence() {
        let report = correlate(&[], &[]);
        assert_eq!(report.confidence, 1.0);
    }
}
