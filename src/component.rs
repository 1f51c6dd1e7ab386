//! Source analysis for UI component files.
//!
//! One pass over a `.tsx`/`.jsx` file collects every ComponentFact
//! field: props, state, the JSX tree, handlers bound in markup, network
//! call sites and effect declarations. Pure and file-local; returns
//! `Ok(None)` for files with no JSX content, which signals "not a UI
//! component" upward without being an error.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

use crate::error::AnalyzeError;
use crate::facts::{
    CallSite, ComponentFact, ComponentKind, EffectFact, HandlerFact, HttpMethod, JsxElement,
    PropDecl, StateVar,
};
use crate::jsx::{extract_jsx_region, parse_jsx_fragment};
use crate::scan::{balanced_inner, find_balanced, object_field_names, split_top_level};

lazy_static! {
    static ref EXPORT_DEFAULT_FN_RE: Regex =
        Regex::new(r"export\s+default\s+(?:async\s+)?function\s+([A-Z][A-Za-z0-9_]*)").unwrap();
    static ref NAMED_FN_RE: Regex =
        Regex::new(r"(?m)^(?:export\s+)?(?:async\s+)?function\s+([A-Z][A-Za-z0-9_]*)\s*\(")
            .unwrap();
    static ref CONST_COMPONENT_RE: Regex =
        Regex::new(r"(?m)^(?:export\s+)?const\s+([A-Z][A-Za-z0-9_]*)[^=\n]*=\s*(?:async\s*)?\(")
            .unwrap();
    static ref USE_STATE_RE: Regex = Regex::new(
        r"const\s*\[\s*([A-Za-z_$][\w$]*)\s*,\s*(set[A-Za-z_$][\w$]*)\s*\]\s*=\s*useState"
    )
    .unwrap();
    static ref USE_EFFECT_RE: Regex = Regex::new(r"useEffect\s*\(").unwrap();
    static ref FETCH_RE: Regex = Regex::new(r"\bfetch\s*\(").unwrap();
    static ref METHOD_OPT_RE: Regex =
        Regex::new(r#"method\s*:\s*['"]([A-Za-z]+)['"]"#).unwrap();
    static ref BODY_KEY_RE: Regex = Regex::new(r"body\s*:\s*").unwrap();
    static ref ARROW_FN_RE: Regex =
        Regex::new(r"const\s+([a-zA-Z_$][\w$]*)\s*=\s*(?:async\s*)?\(([^)]*)\)\s*=>\s*").unwrap();
    static ref FN_DECL_RE: Regex =
        Regex::new(r"(?:async\s+)?function\s+([a-zA-Z_$][\w$]*)\s*\(([^)]*)\)\s*\{").unwrap();
    static ref COMPONENT_PARAMS_RE: Regex = Regex::new(
        r"(?:function\s+[A-Z][A-Za-z0-9_]*|const\s+[A-Z][A-Za-z0-9_]*[^=\n]*=\s*(?:async\s*)?)\s*\("
    )
    .unwrap();
    static ref TYPE_DECL_RE: Regex =
        Regex::new(r"(?:interface|type)\s+([A-Z][A-Za-z0-9_]*)\s*=?\s*\{").unwrap();
    static ref IDENT_RE: Regex = Regex::new(r"^[A-Za-z_$][\w$]*$").unwrap();
    static ref CALL_EXPR_RE: Regex = Regex::new(r"^([A-Za-z_$][\w$]*)\s*\(").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINT
// ═══════════════════════════════════════════════════════════════════════════════

/// Analyzes one UI source file into a ComponentFact.
pub fn analyze_source(path: &str, source: &str) -> Result<Option<ComponentFact>, AnalyzeError> {
    let Some(region) = extract_jsx_region(source) else {
        return Ok(None);
    };

    let mut roots = parse_jsx_fragment(&region).map_err(|e| AnalyzeError::parse(path, e))?;
    let jsx = match roots.len() {
        0 => return Ok(None),
        1 => roots.remove(0),
        _ => {
            let mut fragment = JsxElement::new("fragment");
            fragment.children = roots;
            fragment
        }
    };

    let kind = classify_kind(path);
    let name = component_name(path, source, kind);
    let named_fns = named_functions(source);
    let handlers = collect_handlers(&jsx, &named_fns);

    Ok(Some(ComponentFact {
        name,
        kind,
        file_path: path.to_string(),
        props: extract_props(source),
        state: extract_state(source),
        jsx: Some(jsx),
        handlers,
        calls: extract_call_sites(source),
        effects: extract_effects(source),
    }))
}

// ═══════════════════════════════════════════════════════════════════════════════
// KIND & NAME CLASSIFICATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Page detection by path shape: `page.*` under an `app/` route tree, or
/// any non-underscore file under a legacy `pages/` directory.
pub fn classify_kind(path: &str) -> ComponentKind {
    let normalized = path.replace('\\', "/");
    let parts: Vec<&str> = normalized.split('/').filter(|p| !p.is_empty()).collect();
    let Some(file) = parts.last() else {
        return ComponentKind::Component;
    };
    let stem = file.split('.').next().unwrap_or(file);

    if parts.iter().any(|p| *p == "app") && stem == "page" {
        return ComponentKind::Page;
    }
    if parts.iter().rev().skip(1).any(|p| *p == "pages") && !file.starts_with('_') {
        return ComponentKind::Page;
    }
    ComponentKind::Component
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

fn component_name(path: &str, source: &str, kind: ComponentKind) -> String {
    for re in [&*EXPORT_DEFAULT_FN_RE, &*NAMED_FN_RE, &*CONST_COMPONENT_RE] {
        if let Some(caps) = re.captures(source) {
            return caps[1].to_string();
        }
    }

    // Fall back to the path: `page.tsx` and `index.tsx` name after their
    // directory.
    let normalized = path.replace('\\', "/");
    let parts: Vec<&str> = normalized.split('/').filter(|p| !p.is_empty()).collect();
    let stem = parts
        .last()
        .and_then(|f| f.split('.').next())
        .unwrap_or("component");
    let base = if stem == "page" || stem == "index" {
        parts
            .iter()
            .rev()
            .skip(1)
            .find(|p| !matches!(**p, "app" | "pages" | "src"))
            .copied()
            .unwrap_or("home")
    } else {
        stem
    };

    let mut name = pascal_case(base);
    if name.is_empty() {
        name = "Home".to_string();
    }
    if kind == ComponentKind::Page && !name.ends_with("Page") {
        name.push_str("Page");
    }
    name
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPS
// ═══════════════════════════════════════════════════════════════════════════════

/// Extracts props from a destructured object parameter. Types come from
/// an inline type literal or a same-file interface/type declaration;
/// anything unresolvable is recorded as "unknown" rather than guessed.
fn extract_props(source: &str) -> Vec<PropDecl> {
    let Some(m) = COMPONENT_PARAMS_RE.find(source) else {
        return Vec::new();
    };
    let open = m.end() - 1;
    let Some(params) = balanced_inner(source, open, '(', ')') else {
        return Vec::new();
    };
    let params = params.trim();
    if !params.starts_with('{') {
        return Vec::new();
    }
    let Some(names_inner) = balanced_inner(params, 0, '{', '}') else {
        return Vec::new();
    };

    // Optional type annotation after the destructure pattern.
    let after = params[find_balanced(params, 0, '{', '}').unwrap_or(params.len())..].trim();
    let type_table = if let Some(rest) = after.strip_prefix(':') {
        let rest = rest.trim();
        if rest.starts_with('{') {
            balanced_inner(rest, 0, '{', '}')
                .map(parse_type_literal)
                .unwrap_or_default()
        } else {
            let type_name: String = rest
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect();
            resolve_type_decl(source, &type_name).unwrap_or_default()
        }
    } else {
        HashMap::new()
    };

    let mut props = Vec::new();
    for part in split_top_level(names_inner, ',') {
        let part = part.trim();
        if part.is_empty() || part.starts_with("...") {
            continue;
        }
        let (name, has_default) = match part.split_once('=') {
            Some((n, _)) => (n.trim(), true),
            None => (part, false),
        };
        // Rename patterns (`a: b`) keep the declared prop name.
        let name = name.split(':').next().unwrap_or(name).trim();
        if name.is_empty() {
            continue;
        }
        let (type_text, optional) = type_table
            .get(name)
            .cloned()
            .unwrap_or_else(|| ("unknown".to_string(), false));
        props.push(PropDecl {
            name: name.to_string(),
            type_text,
            required: !optional && !has_default,
        });
    }
    props
}

/// Parses `name?: type` members of a type literal body into
/// name → (type text, optional).
fn parse_type_literal(body: &str) -> HashMap<String, (String, bool)> {
    let mut table = HashMap::new();
    let members = split_top_level(body, ';')
        .into_iter()
        .flat_map(|p| split_top_level(&p, '\n'))
        .collect::<Vec<_>>();
    for member in members {
        let member = member.trim().trim_end_matches(',');
        let Some((name_part, type_part)) = member.split_once(':') else {
            continue;
        };
        let mut name = name_part.trim().to_string();
        let optional = name.ends_with('?');
        if optional {
            name.pop();
        }
        if name.is_empty() || !IDENT_RE.is_match(&name) {
            continue;
        }
        table.insert(name, (type_part.trim().to_string(), optional));
    }
    table
}

fn resolve_type_decl(source: &str, type_name: &str) -> Option<HashMap<String, (String, bool)>> {
    if type_name.is_empty() {
        return None;
    }
    for caps in TYPE_DECL_RE.captures_iter(source) {
        if &caps[1] == type_name {
            let open = caps.get(0).unwrap().end() - 1;
            return balanced_inner(source, open, '{', '}').map(parse_type_literal);
        }
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// State recognition is limited to the `[value, setter] = useState(...)`
/// array-destructure shape.
fn extract_state(source: &str) -> Vec<StateVar> {
    let mut vars = Vec::new();
    for caps in USE_STATE_RE.captures_iter(source) {
        let name = caps[1].to_string();
        let setter = caps[2].to_string();
        let mut pos = caps.get(0).unwrap().end();

        let mut type_text = "unknown".to_string();
        if source[pos..].starts_with('<') {
            if let Some(end) = find_balanced(source, pos, '<', '>') {
                type_text = source[pos + 1..end - 1].trim().to_string();
                pos = end;
            }
        }

        let initializer = source[pos..]
            .find('(')
            .and_then(|rel| balanced_inner(source, pos + rel, '(', ')'))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        vars.push(StateVar {
            name,
            setter,
            type_text,
            initializer,
        });
    }
    vars
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Table of named functions declared in the file: name → (params, body).
fn named_functions(source: &str) -> HashMap<String, (Vec<String>, String)> {
    let mut table = HashMap::new();

    for caps in FN_DECL_RE.captures_iter(source) {
        let open = caps.get(0).unwrap().end() - 1;
        if let Some(body) = balanced_inner(source, open, '{', '}') {
            table.insert(
                caps[1].to_string(),
                (parse_params(&caps[2]), body.trim().to_string()),
            );
        }
    }

    for caps in ARROW_FN_RE.captures_iter(source) {
        let name = caps[1].to_string();
        let params = parse_params(&caps[2]);
        let body_start = caps.get(0).unwrap().end();
        let rest = &source[body_start..];
        let body = if rest.trim_start().starts_with('{') {
            let brace = body_start + (rest.len() - rest.trim_start().len());
            balanced_inner(source, brace, '{', '}').map(|b| b.trim().to_string())
        } else {
            // Expression body runs to the end of the line.
            Some(
                rest.lines()
                    .next()
                    .unwrap_or("")
                    .trim()
                    .trim_end_matches(';')
                    .to_string(),
            )
        };
        if let Some(body) = body {
            table.entry(name).or_insert((params, body));
        }
    }

    table
}

fn parse_params(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|p| {
            p.split(':')
                .next()
                .unwrap_or("")
                .trim()
                .trim_start_matches("...")
                .to_string()
        })
        .filter(|p| !p.is_empty())
        .collect()
}

/// Walks the JSX tree for `on*` attributes and resolves each bound value
/// to a handler fact: bare identifier, direct call, or inline function.
fn collect_handlers(
    jsx: &JsxElement,
    named_fns: &HashMap<String, (Vec<String>, String)>,
) -> Vec<HandlerFact> {
    let mut handlers = Vec::new();
    let mut seen = std::collections::HashSet::new();
    walk_handlers(jsx, named_fns, &mut handlers, &mut seen);
    handlers
}

fn walk_handlers(
    element: &JsxElement,
    named_fns: &HashMap<String, (Vec<String>, String)>,
    out: &mut Vec<HandlerFact>,
    seen: &mut std::collections::HashSet<String>,
) {
    for (attr, value) in &element.attributes {
        if !attr.starts_with("on") || attr.len() <= 2 {
            continue;
        }
        let trigger = attr[2..].to_lowercase();
        if let Some(handler) = resolve_handler(value, &trigger, named_fns) {
            let key = format!("{}:{}:{}", handler.name, handler.trigger, handler.body);
            if seen.insert(key) {
                out.push(handler);
            }
        }
    }
    for child in &element.children {
        walk_handlers(child, named_fns, out, seen);
    }
}

fn resolve_handler(
    value: &str,
    trigger: &str,
    named_fns: &HashMap<String, (Vec<String>, String)>,
) -> Option<HandlerFact> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    // Inline function: `() => ...`, `(e) => { ... }` or `e => ...`.
    if let Some(arrow) = value.find("=>") {
        let before = value[..arrow].trim();
        let is_inline =
            before.is_empty() || before.starts_with('(') || before.starts_with("async") || IDENT_RE.is_match(before);
        if is_inline {
            let params = if before.contains('(') {
                let open = value.find('(')?;
                balanced_inner(value, open, '(', ')')
                    .map(parse_params)
                    .unwrap_or_default()
            } else if IDENT_RE.is_match(before) {
                vec![before.to_string()]
            } else {
                Vec::new()
            };
            let mut body = value[arrow + 2..].trim().to_string();
            if body.starts_with('{') {
                if let Some(inner) = balanced_inner(&body, 0, '{', '}') {
                    body = inner.trim().to_string();
                }
            }
            // A trivial forwarder like `() => handleDelete(id)` resolves to
            // the named handler when its body is known.
            if let Some(caps) = CALL_EXPR_RE.captures(&body) {
                if let Some((fn_params, named_body)) = named_fns.get(&caps[1]) {
                    if body.trim_end_matches(';').trim_end().ends_with(')') {
                        return Some(HandlerFact {
                            name: caps[1].to_string(),
                            trigger: trigger.to_string(),
                            body: named_body.clone(),
                            params: fn_params.clone(),
                            inline: false,
                        });
                    }
                }
            }
            return Some(HandlerFact {
                name: String::new(),
                trigger: trigger.to_string(),
                body,
                params,
                inline: true,
            });
        }
    }

    // Bare identifier: `onClick={handleAdd}`.
    if IDENT_RE.is_match(value) {
        let (params, body) = named_fns
            .get(value)
            .cloned()
            .unwrap_or((Vec::new(), String::new()));
        return Some(HandlerFact {
            name: value.to_string(),
            trigger: trigger.to_string(),
            body,
            params,
            inline: false,
        });
    }

    // Direct call: `onClick={handleAdd(id)}`.
    if let Some(caps) = CALL_EXPR_RE.captures(value) {
        let name = caps[1].to_string();
        let (params, body) = named_fns
            .get(&name)
            .cloned()
            .unwrap_or((Vec::new(), String::new()));
        return Some(HandlerFact {
            name,
            trigger: trigger.to_string(),
            body,
            params,
            inline: false,
        });
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════════
// CALL SITES & EFFECTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Every fetch-like call in the file, with its method, raw path text and
/// body field names.
fn extract_call_sites(source: &str) -> Vec<CallSite> {
    let mut calls = Vec::new();
    for m in FETCH_RE.find_iter(source) {
        let open = m.end() - 1;
        let Some(args) = balanced_inner(source, open, '(', ')') else {
            continue;
        };
        let parts = split_top_level(args, ',');
        let Some(path) = parts.first().map(|p| p.trim().to_string()) else {
            continue;
        };
        if path.is_empty() {
            continue;
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

        calls.push(CallSite {
            method,
            path,
            body_fields,
        });
    }
    calls
}

/// Body field names from `body: JSON.stringify({ ... })` or a direct
/// object literal.
pub fn extract_body_fields(options: &str) -> Vec<String> {
    let Some(m) = BODY_KEY_RE.find(options) else {
        return Vec::new();
    };
    let rest = options[m.end()..].trim_start();
    let object = if let Some(stripped) = rest.strip_prefix("JSON.stringify") {
        stripped
            .find('(')
            .and_then(|rel| balanced_inner(stripped, rel, '(', ')'))
            .map(|s| s.trim().to_string())
    } else {
        Some(rest.to_string())
    };

    let Some(object) = object else {
        return Vec::new();
    };
    if object.starts_with('{') {
        balanced_inner(&object, 0, '{', '}')
            .map(object_field_names)
            .unwrap_or_default()
    } else {
        Vec::new()
    }
}

fn extract_effects(source: &str) -> Vec<EffectFact> {
    let mut effects = Vec::new();
    for m in USE_EFFECT_RE.find_iter(source) {
        let open = m.end() - 1;
        let Some(args) = balanced_inner(source, open, '(', ')') else {
            continue;
        };
        let parts = split_top_level(args, ',');
        let Some(callback) = parts.first() else {
            continue;
        };
        let body = callback
            .find("=>")
            .map(|arrow| {
                let b = callback[arrow + 2..].trim();
                if b.starts_with('{') {
                    balanced_inner(b, 0, '{', '}')
                        .map(|s| s.trim().to_string())
                        .unwrap_or_else(|| b.to_string())
                } else {
                    b.to_string()
                }
            })
            .unwrap_or_else(|| callback.trim().to_string());

        let deps = parts
            .get(1)
            .map(|d| d.trim())
            .filter(|d| d.starts_with('['))
            .and_then(|d| balanced_inner(d, 0, '[', ']'))
            .map(|inner| {
                inner
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        effects.push(EffectFact { deps, body });
    }
    effects
}
