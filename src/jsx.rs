//! JSX tree parsing.
//!
//! The JSX region of a component is extracted lexically, its `{expr}`
//! spans are normalized to placeholders so html5ever can parse the
//! remainder as HTML, and the resulting DOM is folded into the crate's
//! own `JsxElement` tree. Component-tag casing is preserved through a
//! marker attribute because html5ever lowercases all tag names.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use lazy_static::lazy_static;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use regex::Regex;
use std::collections::HashMap;

use crate::facts::JsxElement;
use crate::scan::{balanced_inner, find_balanced};

const MARKER_ATTR: &str = "data-wl-orig";
const FRAGMENT_TAG: &str = "wl-fragment";

lazy_static! {
    static ref EXPR_PLACEHOLDER_RE: Regex = Regex::new(r"__WL_EXPR_(\d+)__").unwrap();
    static ref RETURN_PAREN_RE: Regex = Regex::new(r"(?:\breturn|=>)\s*\(").unwrap();
    static ref RETURN_TAG_RE: Regex = Regex::new(r"\breturn\s*<").unwrap();
    static ref JSX_COMMENT_RE: Regex = Regex::new(r"(?s)\{\s*/\*.*?\*/\s*\}").unwrap();
    static ref COMPONENT_OPEN_RE: Regex = Regex::new(r"<([A-Z][a-zA-Z0-9.]*)([\s/>])").unwrap();
    static ref SELF_CLOSING_RE: Regex =
        Regex::new(r#"<([A-Za-z][a-zA-Z0-9.:-]*)((?:[^<>"']|"[^"]*"|'[^']*')*?)\s*/>"#).unwrap();

    /// html5ever lowercases attribute names; JSX casing is restored for
    /// the attributes the analyzers look at.
    static ref ATTR_CASE_MAP: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("classname", "className");
        m.insert("htmlfor", "htmlFor");
        m.insert("defaultvalue", "defaultValue");
        m.insert("readonly", "readOnly");
        m.insert("onclick", "onClick");
        m.insert("onsubmit", "onSubmit");
        m.insert("onchange", "onChange");
        m.insert("oninput", "onInput");
        m.insert("onblur", "onBlur");
        m.insert("onfocus", "onFocus");
        m.insert("onkeydown", "onKeyDown");
        m.insert("onkeyup", "onKeyUp");
        m.insert("ondoubleclick", "onDoubleClick");
        m
    };

    /// HTML void elements never take a closing tag.
    static ref VOID_TAGS: std::collections::HashSet<&'static str> = {
        let mut s = std::collections::HashSet::new();
        for t in [
            "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
            "source", "track", "wbr",
        ] {
            s.insert(t);
        }
        s
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// JSX REGION EXTRACTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Finds the JSX markup a component renders: the first parenthesized
/// `return (...)` or `=> (...)` whose content starts with a tag, with a
/// bare `return <...>` as fallback. None means the file renders nothing.
pub fn extract_jsx_region(source: &str) -> Option<String> {
    for m in RETURN_PAREN_RE.find_iter(source) {
        let open = m.end() - 1;
        if let Some(inner) = balanced_inner(source, open, '(', ')') {
            if inner.trim_start().starts_with('<') {
                return Some(inner.to_string());
            }
        }
    }

    if let Some(m) = RETURN_TAG_RE.find(source) {
        let start = m.end() - 1;
        if let Some(end) = find_jsx_end(source, start) {
            return Some(source[start..end].to_string());
        }
    }

    None
}

/// Scans past one complete JSX element starting at `start` (which must
/// point at `<`), tracking tag depth. Braced spans are skipped whole so
/// comparison operators inside expressions do not look like tags.
fn find_jsx_end(source: &str, start: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut i = start;
    let bytes = source.as_bytes();

    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                i = find_balanced(source, i, '{', '}')?;
            }
            b'<' => {
                let closing = bytes.get(i + 1) == Some(&b'/');
                let tag_start = if closing { i + 2 } else { i + 1 };
                let rest = &source[tag_start..];
                let name: String = rest
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '-')
                    .collect();
                // Find the end of the tag, respecting quoted attributes.
                let mut j = tag_start;
                let mut quote: Option<u8> = None;
                while j < bytes.len() {
                    let c = bytes[j];
                    if let Some(q) = quote {
                        if c == q {
                            quote = None;
                        }
                    } else if c == b'"' || c == b'\'' {
                        quote = Some(c);
                    } else if c == b'{' {
                        j = find_balanced(source, j, '{', '}')?;
                        continue;
                    } else if c == b'>' {
                        break;
                    }
                    j += 1;
                }
                if j >= bytes.len() {
                    return None;
                }
                let self_closing = bytes[j - 1] == b'/';
                let void = VOID_TAGS.contains(name.to_ascii_lowercase().as_str());
                if closing {
                    depth -= 1;
                } else if !self_closing && !void && !name.is_empty() {
                    depth += 1;
                }
                i = j + 1;
                if depth <= 0 {
                    return Some(i);
                }
                continue;
            }
            _ => {
                i += 1;
            }
        }
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════════
// NORMALIZATION PRE-PASSES
// ═══════════════════════════════════════════════════════════════════════════════

/// Replaces every balanced `{expr}` span with a placeholder so the
/// fragment parses as plain HTML. Returns the normalized text and the
/// placeholder → expression map.
fn normalize_expressions(jsx: &str) -> (String, HashMap<String, String>) {
    let mut normalized = String::new();
    let mut expressions = HashMap::new();
    let mut counter = 0usize;
    let mut i = 0usize;
    let bytes = jsx.as_bytes();

    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(end) = find_balanced(jsx, i, '{', '}') {
                let content = jsx[i + 1..end - 1].trim().to_string();
                let placeholder = format!("__WL_EXPR_{}__", counter);
                expressions.insert(placeholder.clone(), content);
                normalized.push_str(&placeholder);
                counter += 1;
                i = end;
                continue;
            }
        }
        // Advance one full character.
        let ch_len = jsx[i..].chars().next().map(|c| c.len_utf8()).unwrap_or(1);
        normalized.push_str(&jsx[i..i + ch_len]);
        i += ch_len;
    }

    (normalized, expressions)
}

/// `<>...</>` fragments become a named container tag.
fn name_fragments(jsx: &str) -> String {
    jsx.replace("<>", &format!("<{}>", FRAGMENT_TAG))
        .replace("</>", &format!("</{}>", FRAGMENT_TAG))
}

/// Expands self-closing tags so html5ever does not swallow following
/// siblings as children. Void elements keep their open-tag form.
fn expand_self_closing(jsx: &str) -> String {
    SELF_CLOSING_RE
        .replace_all(jsx, |caps: &regex::Captures| {
            let name = &caps[1];
            let attrs = &caps[2];
            if VOID_TAGS.contains(name.to_ascii_lowercase().as_str()) {
                format!("<{}{}>", name, attrs)
            } else {
                format!("<{}{}></{}>", name, attrs, name)
            }
        })
        .to_string()
}

/// Marks uppercase component tags with the original name so casing
/// survives html5ever's lowercasing.
fn mark_component_tags(jsx: &str) -> String {
    COMPONENT_OPEN_RE
        .replace_all(jsx, |caps: &regex::Captures| {
            format!("<{} {}=\"{}\"{}", &caps[1], MARKER_ATTR, &caps[1], &caps[2])
        })
        .to_string()
}

fn restore_attr_name(name: &str) -> String {
    ATTR_CASE_MAP
        .get(name)
        .map(|s| s.to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Replaces placeholder occurrences inside an attribute value with the
/// original expression text.
fn restore_placeholders(value: &str, expressions: &HashMap<String, String>) -> String {
    EXPR_PLACEHOLDER_RE
        .replace_all(value, |caps: &regex::Captures| {
            expressions
                .get(caps.get(0).unwrap().as_str())
                .cloned()
                .unwrap_or_default()
        })
        .to_string()
}

// ═══════════════════════════════════════════════════════════════════════════════
// MAP EXPRESSIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Splits `source.map(item => body)` into (source, item variable, body).
/// The body keeps its original text, including nested JSX.
pub fn parse_map_expression(code: &str) -> Option<(String, String, String)> {
    let map_index = code.find(".map(")?;
    let source = code[..map_index].trim().to_string();
    if source.is_empty() {
        return None;
    }

    let open = map_index + 4;
    let inner = balanced_inner(code, open, '(', ')')?;
    let arrow = inner.find("=>")?;
    let params = inner[..arrow].trim().trim_matches(|c| c == '(' || c == ')');
    let item_var = params.split(',').next().unwrap_or("").trim().to_string();

    let mut body = inner[arrow + 2..].trim().to_string();
    if body.starts_with('(') {
        if let Some(end) = find_balanced(&body, 0, '(', ')') {
            if end == body.len() {
                body = body[1..body.len() - 1].trim().to_string();
            }
        }
    }

    Some((source, item_var, body))
}

// ═══════════════════════════════════════════════════════════════════════════════
// DOM FOLDING
// ═══════════════════════════════════════════════════════════════════════════════

/// Parses a JSX fragment into element trees. Multiple roots come back as
/// multiple elements (fragments are flattened by the caller if desired).
pub fn parse_jsx_fragment(jsx: &str) -> Result<Vec<JsxElement>, String> {
    let stripped = JSX_COMMENT_RE.replace_all(jsx, "").to_string();
    let (normalized, expressions) = normalize_expressions(&stripped);
    let named = name_fragments(&normalized);
    let expanded = expand_self_closing(&named);
    let marked = mark_component_tags(&expanded);

    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut marked.as_bytes())
        .map_err(|e| format!("html parse failed: {}", e))?;

    let keep_document_tags = jsx.to_lowercase().contains("<html");
    let mut roots = Vec::new();
    collect_content(&dom.document, &expressions, keep_document_tags, &mut roots);
    Ok(roots)
}

/// Folds the document, flattening the html/head/body wrappers html5ever
/// inserts unless the source itself declared them.
fn collect_content(
    handle: &Handle,
    expressions: &HashMap<String, String>,
    keep_document_tags: bool,
    out: &mut Vec<JsxElement>,
) {
    match &handle.data {
        NodeData::Document => {
            for child in handle.children.borrow().iter() {
                collect_content(child, expressions, keep_document_tags, out);
            }
        }
        NodeData::Element { name, .. } => {
            let tag = name.local.to_string().to_lowercase();
            let is_wrapper = tag == "html" || tag == "head" || tag == "body";
            if is_wrapper && !keep_document_tags {
                for child in handle.children.borrow().iter() {
                    collect_content(child, expressions, keep_document_tags, out);
                }
            } else {
                out.extend(fold_node(handle, expressions));
            }
        }
        _ => {}
    }
}

/// Converts one DOM node into zero or more JsxElements. Text content is
/// gathered onto the parent; `.map(...)` expressions in child position
/// hoist their item markup into the parent's children.
fn fold_node(handle: &Handle, expressions: &HashMap<String, String>) -> Vec<JsxElement> {
    match &handle.data {
        NodeData::Element { name, attrs, .. } => {
            let mut kind = name.local.to_string();
            let mut element = JsxElement::new(&kind);

            for attr in attrs.borrow().iter() {
                let attr_name = attr.name.local.to_string();
                let attr_value = attr.value.to_string();
                if attr_name == MARKER_ATTR {
                    kind = attr_value.clone();
                    continue;
                }
                element.attributes.insert(
                    restore_attr_name(&attr_name),
                    restore_placeholders(&attr_value, expressions),
                );
            }
            element.kind = kind;
            if element.kind == FRAGMENT_TAG {
                element.kind = "fragment".to_string();
            }

            let mut text_parts: Vec<String> = Vec::new();
            for child in handle.children.borrow().iter() {
                match &child.data {
                    NodeData::Text { contents } => {
                        fold_text(
                            &contents.borrow(),
                            expressions,
                            &mut element,
                            &mut text_parts,
                        );
                    }
                    _ => element.children.extend(fold_node(child, expressions)),
                }
            }
            if !text_parts.is_empty() {
                element.text = Some(text_parts.join(" "));
            }

            vec![element]
        }
        NodeData::Text { .. } | NodeData::Comment { .. } => vec![],
        NodeData::Document => {
            let mut nodes = Vec::new();
            for child in handle.children.borrow().iter() {
                nodes.extend(fold_node(child, expressions));
            }
            nodes
        }
        _ => vec![],
    }
}

/// Text child handling: literal runs join the parent's text; expression
/// placeholders either hoist map-rendered markup or contribute their
/// code text.
fn fold_text(
    text: &str,
    expressions: &HashMap<String, String>,
    parent: &mut JsxElement,
    text_parts: &mut Vec<String>,
) {
    let mut last_end = 0usize;
    for caps in EXPR_PLACEHOLDER_RE.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let before = text[last_end..m.start()].trim();
        if !before.is_empty() {
            text_parts.push(before.to_string());
        }
        if let Some(code) = expressions.get(m.as_str()) {
            match parse_map_expression(code) {
                Some((source, item_var, body)) if body.contains('<') => {
                    parent.list_source = Some(source);
                    parent.list_item_var = Some(item_var);
                    if let Ok(items) = parse_jsx_fragment(&body) {
                        parent.children.extend(items);
                    }
                }
                _ => text_parts.push(code.clone()),
            }
        }
        last_end = m.end();
    }
    let after = text[last_end..].trim();
    if !after.is_empty() {
        text_parts.push(after.to_string());
    }
}
