//! Lexical scanning helpers shared by the analyzers and the translator.
//!
//! All scanners are string-aware: single/double quotes, template
//! literals (including `${}` interpolation) and escape sequences never
//! confuse delimiter balancing. Indices in and out are byte offsets.

// ═══════════════════════════════════════════════════════════════════════════════
// BALANCED DELIMITERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Finds the end of a balanced delimiter pair, starting at the opening
/// delimiter. Returns the byte index just past the closing delimiter,
/// or None if unbalanced. `start_index` must point at `open`.
pub fn find_balanced(text: &str, start_index: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string: Option<char> = None;
    let mut in_template = false;
    let mut template_brace_depth = 0i32;
    let mut escape = false;

    for (off, c) in text[start_index..].char_indices() {
        if escape {
            escape = false;
            continue;
        }
        if c == '\\' {
            escape = true;
            continue;
        }

        if let Some(q) = in_string {
            if c == q {
                in_string = None;
            }
            continue;
        }

        if in_template {
            if c == '`' && template_brace_depth == 0 {
                in_template = false;
            } else if c == '{' {
                template_brace_depth += 1;
            } else if c == '}' && template_brace_depth > 0 {
                template_brace_depth -= 1;
            }
            continue;
        }

        match c {
            '"' | '\'' => in_string = Some(c),
            '`' => in_template = true,
            _ if c == open => depth += 1,
            _ if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(start_index + off + c.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}

/// The content inside a balanced pair whose opening delimiter sits at
/// `open_index`.
pub fn balanced_inner(text: &str, open_index: usize, open: char, close: char) -> Option<&str> {
    let end = find_balanced(text, open_index, open, close)?;
    Some(&text[open_index + open.len_utf8()..end - close.len_utf8()])
}

// ═══════════════════════════════════════════════════════════════════════════════
// TOP-LEVEL SPLITTING
// ═══════════════════════════════════════════════════════════════════════════════

/// Splits `text` on `sep` occurrences at delimiter depth zero.
pub fn split_top_level(text: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut in_string: Option<char> = None;
    let mut in_template = false;
    let mut escape = false;

    for c in text.chars() {
        if escape {
            escape = false;
            current.push(c);
            continue;
        }
        if c == '\\' {
            escape = true;
            current.push(c);
            continue;
        }

        if let Some(q) = in_string {
            if c == q {
                in_string = None;
            }
            current.push(c);
            continue;
        }
        if in_template {
            if c == '`' {
                in_template = false;
            }
            current.push(c);
            continue;
        }

        match c {
            '"' | '\'' => in_string = Some(c),
            '`' => in_template = true,
            '(' | '{' | '[' => depth += 1,
            ')' | '}' | ']' => depth -= 1,
            _ => {}
        }

        if c == sep && depth == 0 {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }

    if !current.trim().is_empty() || parts.is_empty() {
        parts.push(current);
    }
    parts
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATEMENT SPLITTING
// ═══════════════════════════════════════════════════════════════════════════════

/// Continuation markers: a line ending in one of these is not a complete
/// statement yet.
const TRAILING_CONTINUATIONS: [&str; 10] = ["=>", "&&", "||", "=", "+", "-", "*", ",", "(", "."];

/// Splits a handler/function body into individual statement texts.
///
/// Splits on `;` and on newlines at delimiter depth zero, keeping
/// multi-line blocks (`if { ... } else { ... }`), chained calls and
/// trailing-operator continuations together. Comment lines are dropped.
pub fn split_statements(body: &str) -> Vec<String> {
    let mut statements: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut in_string: Option<char> = None;
    let mut in_template = false;
    let mut escape = false;
    let mut in_line_comment = false;
    let mut prev: Option<char> = None;

    let flush = |current: &mut String, statements: &mut Vec<String>| {
        let trimmed = current.trim();
        if !trimmed.is_empty() {
            statements.push(trimmed.to_string());
        }
        current.clear();
    };

    for (off, c) in body.char_indices() {
        if in_line_comment {
            if c == '\n' {
                in_line_comment = false;
                let continues = {
                    let trimmed = current.trim_end();
                    TRAILING_CONTINUATIONS.iter().any(|op| trimmed.ends_with(op))
                };
                if depth == 0 && !continues {
                    flush(&mut current, &mut statements);
                }
            }
            prev = Some(c);
            continue;
        }
        if escape {
            escape = false;
            current.push(c);
            prev = Some(c);
            continue;
        }
        if c == '\\' {
            escape = true;
            current.push(c);
            prev = Some(c);
            continue;
        }

        if let Some(q) = in_string {
            if c == q {
                in_string = None;
            }
            current.push(c);
            prev = Some(c);
            continue;
        }
        if in_template {
            if c == '`' {
                in_template = false;
            }
            current.push(c);
            prev = Some(c);
            continue;
        }

        if c == '/' && prev == Some('/') {
            // Drop the first slash already buffered.
            current.pop();
            in_line_comment = true;
            prev = Some(c);
            continue;
        }

        match c {
            '"' | '\'' => in_string = Some(c),
            '`' => in_template = true,
            '(' | '{' | '[' => depth += 1,
            ')' | '}' | ']' => depth -= 1,
            _ => {}
        }

        if depth == 0 && c == ';' {
            flush(&mut current, &mut statements);
            prev = Some(c);
            continue;
        }

        if depth == 0 && c == '\n' {
            let trimmed = current.trim_end();
            let continues = TRAILING_CONTINUATIONS.iter().any(|op| trimmed.ends_with(op));
            let rest = body[off..].trim_start();
            let next_joins = rest.starts_with("else") || rest.starts_with('.') || rest.starts_with('?');
            if !continues && !next_joins {
                flush(&mut current, &mut statements);
                prev = Some(c);
                continue;
            }
        }

        current.push(c);
        prev = Some(c);
    }

    flush(&mut current, &mut statements);
    statements
}

// ═══════════════════════════════════════════════════════════════════════════════
// SMALL LEXICAL UTILITIES
// ═══════════════════════════════════════════════════════════════════════════════

/// Strips one layer of matching single quotes, double quotes or
/// backticks.
pub fn strip_quotes(text: &str) -> &str {
    let t = text.trim();
    for q in ['"', '\'', '`'] {
        if t.len() >= 2 && t.starts_with(q) && t.ends_with(q) {
            return &t[1..t.len() - 1];
        }
    }
    t
}

pub fn is_quoted(text: &str) -> bool {
    let t = text.trim();
    ['"', '\'', '`']
        .iter()
        .any(|&q| t.len() >= 2 && t.starts_with(q) && t.ends_with(q))
}

const JS_KEYWORDS: [&str; 22] = [
    "const", "let", "var", "if", "else", "return", "await", "async", "function", "true", "false",
    "null", "undefined", "new", "typeof", "in", "of", "for", "while", "switch", "case", "this",
];

pub fn is_js_keyword(word: &str) -> bool {
    JS_KEYWORDS.contains(&word)
}

/// Field names from an object-literal body: shorthand identifiers and
/// `key: value` keys; spreads are skipped.
pub fn object_field_names(inner: &str) -> Vec<String> {
    let mut fields = Vec::new();
    for part in split_top_level(inner, ',') {
        let part = part.trim();
        if part.is_empty() || part.starts_with("...") {
            continue;
        }
        let key = part.split(':').next().unwrap_or("").trim();
        let key = key.trim_matches(|c| c == '"' || c == '\'');
        if !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        {
            fields.push(key.to_string());
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn balanced_handles_strings_and_templates() {
        assert_eq!(find_balanced("{hello}", 0, '{', '}'), Some(7));
        assert_eq!(find_balanced("{'a { b'}", 0, '{', '}'), Some(9));
        assert_eq!(find_balanced("(`/${x}/y`)", 0, '(', ')'), Some(11));
        assert_eq!(find_balanced("{unclosed", 0, '{', '}'), None);
    }

    #[test]
    fn balanced_inner_returns_content() {
        assert_eq!(balanced_inner("({ a: 1 })", 0, '(', ')'), Some("{ a: 1 }"));
    }

    #[test]
    fn split_top_level_respects_nesting() {
        let parts = split_top_level("'/api/tasks', { method: 'POST', body: b }", ',');
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].trim(), "'/api/tasks'");
    }

    #[test]
    fn statements_split_on_semicolons_and_newlines() {
        let body = "const a = 1;\nsetTasks([...tasks, a])\nconsole.log(a);";
        let stmts = split_statements(body);
        assert_eq!(stmts.len(), 3);
    }

    #[test]
    fn if_else_blocks_stay_together() {
        let body = "if (ok) {\n  doA();\n} else {\n  doB();\n}\nafter();";
        let stmts = split_statements(body);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].contains("else"));
        assert_eq!(stmts[1], "after()");
    }

    #[test]
    fn chained_calls_stay_together() {
        let body = "fetch('/api/tasks')\n  .then(r => r.json())\n  .then(setTasks)";
        let stmts = split_statements(body);
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn line_comments_are_dropped() {
        let body = "// comment line\ndoIt(); // trailing\n";
        let stmts = split_statements(body);
        assert_eq!(stmts, vec!["doIt()".to_string()]);
    }

    #[test]
    fn object_field_names_from_shorthand_and_pairs() {
        assert_eq!(
            object_field_names("title, completed: false, ...rest"),
            vec!["title", "completed"]
        );
    }
}
