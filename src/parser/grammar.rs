//! Argument grammar for `Tool: name(key="value", ...)` calls
//!
//! ```text
//! call     := "Tool:" ws* ident ws* "(" args [")"]
//! args     := [arg ("," arg)*]
//! arg      := ident "=" value | value            (positional only first)
//! value    := dq-string | sq-string | json | bare
//! json     := balanced "{...}" or "[...]"
//! bare     := chars up to the next "," or ")"
//! ```
//!
//! Parsing is tolerant: an unterminated string or list runs to the end of
//! input, and the first remainder that does not fit the grammar ends the
//! argument list without failing the call.

use serde_json::{Map, Value};

pub const TOOL_MARKER: &str = "Tool:";

/// Byte cursor over the source text. All syntax characters are ASCII, so
/// positions always land on char boundaries.
#[derive(Debug, Clone)]
pub(crate) struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    pub(crate) fn at(src: &'a str, pos: usize) -> Self {
        Self { src, pos }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn skip_decoration(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace() || c == '*' || c == '`') {
            self.bump();
        }
    }

    fn ident(&mut self) -> Option<&'a str> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return None,
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.bump();
        }
        Some(&self.src[start..self.pos])
    }

    /// True when only whitespace separates the cursor from `,`, `)` or EOF
    fn at_value_end(&self) -> bool {
        let trimmed = self.rest().trim_start();
        trimmed.is_empty() || trimmed.starts_with(',') || trimmed.starts_with(')')
    }
}

/// Locate the first `Tool: name(` and return the name plus the byte offset
/// where the argument list starts.
pub(crate) fn find_call(text: &str) -> Option<(&str, usize)> {
    for (idx, _) in text.match_indices(TOOL_MARKER) {
        let mut cursor = Cursor::at(text, idx + TOOL_MARKER.len());
        cursor.skip_decoration();
        let Some(name) = cursor.ident() else {
            continue;
        };
        cursor.skip_ws();
        if cursor.eat('(') {
            return Some((name, cursor.pos()));
        }
    }
    None
}

/// Result of the generic argument grammar
#[derive(Debug, Clone, Default)]
pub(crate) struct ParsedArgs {
    /// Named arguments in source order
    pub named: Map<String, Value>,
    /// A leading argument without a name
    pub positional: Option<Value>,
    /// Whether the closing `)` was seen
    pub closed: bool,
}

/// Parse an argument list (the text after the opening parenthesis)
pub(crate) fn parse_arguments(src: &str) -> ParsedArgs {
    let mut cursor = Cursor::new(src);
    let mut parsed = ParsedArgs::default();
    let mut first = true;

    loop {
        cursor.skip_ws();
        if cursor.is_eof() {
            break;
        }
        if cursor.eat(')') {
            parsed.closed = true;
            break;
        }

        let save = cursor.pos();
        let mut matched = false;
        if let Some(name) = cursor.ident() {
            cursor.skip_ws();
            if cursor.eat('=') {
                cursor.skip_ws();
                let value = parse_value(&mut cursor);
                parsed.named.insert(name.to_string(), value);
                matched = true;
            } else {
                cursor = Cursor::at(src, save);
            }
        }

        if !matched {
            if !first {
                break;
            }
            parsed.positional = Some(parse_value(&mut cursor));
        }
        first = false;

        cursor.skip_ws();
        if cursor.eat(',') {
            continue;
        }
        if cursor.eat(')') {
            parsed.closed = true;
        }
        break;
    }

    parsed
}

/// Parse one value at the cursor
pub(crate) fn parse_value(cursor: &mut Cursor<'_>) -> Value {
    match cursor.peek() {
        Some(q @ ('"' | '\'')) => {
            cursor.bump();
            Value::String(parse_quoted(cursor, q))
        }
        Some('{') | Some('[') => parse_json_literal(cursor),
        _ => parse_bare(cursor),
    }
}

/// Quoted string after its opening quote. A quote only closes the string
/// when followed by `,`, `)` or end of input, so unescaped embedded quotes
/// survive.
fn parse_quoted(cursor: &mut Cursor<'_>, quote: char) -> String {
    let mut out = String::new();
    while let Some(c) = cursor.bump() {
        if c == '\\' {
            match cursor.bump() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('u') => match read_unicode_escape(cursor) {
                    Some(ch) => out.push(ch),
                    None => out.push_str("\\u"),
                },
                Some(e @ ('"' | '\'' | '\\')) => out.push(e),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else if c == quote && cursor.at_value_end() {
            return out;
        } else {
            out.push(c);
        }
    }
    tracing::debug!("[Parser] Unterminated string argument ({} chars)", out.len());
    out
}

/// `XXXX` after `\u`, joining a UTF-16 surrogate pair written as two escapes
fn read_unicode_escape(cursor: &mut Cursor<'_>) -> Option<char> {
    let rest = cursor.rest();
    let code = u32::from_str_radix(rest.get(..4)?, 16).ok()?;

    if (0xD800..0xDC00).contains(&code) {
        let low = rest
            .get(4..10)
            .and_then(|pair| pair.strip_prefix("\\u"))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .filter(|low| (0xDC00..0xE000).contains(low))?;
        let ch = char::from_u32(0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00))?;
        cursor.pos += 10;
        return Some(ch);
    }

    let ch = char::from_u32(code)?;
    cursor.pos += 4;
    Some(ch)
}

/// Balanced `{...}` / `[...]` literal, parsed as JSON (or as a single-quoted
/// literal with `True`/`None` as a second attempt). Falls back to the raw text.
fn parse_json_literal(cursor: &mut Cursor<'_>) -> Value {
    let start = cursor.pos();
    let mut depth = 0usize;
    let mut in_string: Option<char> = None;
    let mut last_item_end: Option<usize> = None;
    let mut end: Option<usize> = None;

    while let Some(c) = cursor.bump() {
        if let Some(q) = in_string {
            if c == '\\' {
                cursor.bump();
            } else if c == q {
                in_string = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => in_string = Some(c),
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    end = Some(cursor.pos());
                    break;
                }
                if depth == 1 {
                    last_item_end = Some(cursor.pos());
                }
            }
            _ => {}
        }
    }

    let src = cursor.src;
    match end {
        Some(end) => {
            let literal = &src[start..end];
            decode_literal(literal).unwrap_or_else(|| Value::String(literal.to_string()))
        }
        None => {
            // Truncated list: keep the complete items
            if src[start..].starts_with('[') {
                if let Some(item_end) = last_item_end {
                    let repaired = format!("{}]", &src[start..item_end]);
                    if let Some(value) = decode_literal(&repaired) {
                        tracing::warn!("[Parser] Repaired truncated list argument");
                        return value;
                    }
                }
            }
            Value::String(src[start..].trim_end().to_string())
        }
    }
}

fn decode_literal(literal: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(literal) {
        return Some(value);
    }
    let relaxed = literal
        .replace('\'', "\"")
        .replace("True", "true")
        .replace("False", "false")
        .replace("None", "null");
    serde_json::from_str(&relaxed).ok()
}

fn parse_bare(cursor: &mut Cursor<'_>) -> Value {
    let start = cursor.pos();
    while let Some(c) = cursor.peek() {
        if c == ',' || c == ')' {
            break;
        }
        cursor.bump();
    }
    let token = cursor.src[start..cursor.pos()].trim();
    match token {
        "None" | "null" => Value::Null,
        "True" | "true" => Value::Bool(true),
        "False" | "false" => Value::Bool(false),
        _ => token
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(token.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(src: &str) -> ParsedArgs {
        parse_arguments(src)
    }

    #[test]
    fn test_find_call() {
        let text = "I'll search first.\nTool: search_web_serp(query=\"x\")";
        let (name, offset) = find_call(text).unwrap();
        assert_eq!(name, "search_web_serp");
        assert_eq!(&text[offset..], "query=\"x\")");
    }

    #[test]
    fn test_find_call_skips_markdown_and_bad_markers() {
        let text = "Tool: none here. **Tool:** `get_page_content(url=\"http://a\")`";
        let (name, _) = find_call(text).unwrap();
        assert_eq!(name, "get_page_content");
        assert!(find_call("No tools today").is_none());
        assert!(find_call("Tool: search_web_serp without parens").is_none());
    }

    #[test]
    fn test_quoted_arguments() {
        let parsed = args(r#"artist="Luis Fonsi", title='Despacito')"#);
        assert!(parsed.closed);
        assert_eq!(parsed.named["artist"], "Luis Fonsi");
        assert_eq!(parsed.named["title"], "Despacito");
    }

    #[test]
    fn test_json_and_bare_arguments() {
        let parsed = args(r#"vocabulary=[{"spanish": "sí"}], max_results=3, flag=True, note=plain text)"#);
        assert_eq!(parsed.named["vocabulary"], json!([{"spanish": "sí"}]));
        assert_eq!(parsed.named["max_results"], json!(3));
        assert_eq!(parsed.named["flag"], json!(true));
        assert_eq!(parsed.named["note"], "plain text");
    }

    #[test]
    fn test_single_quoted_literal() {
        let parsed = args("lyrics={'spanish_lyrics': 'hola', 'ok': True})");
        assert_eq!(parsed.named["lyrics"], json!({"spanish_lyrics": "hola", "ok": true}));
    }

    #[test]
    fn test_unicode_escapes_including_surrogate_pairs() {
        let parsed = args(r#"text="Te quiero \ud83d\ude00 mucho, coraz\u00f3n")"#);
        assert_eq!(parsed.named["text"], "Te quiero 😀 mucho, corazón");

        let parsed = args(r#"text="solo \ud83d aquí")"#);
        assert_eq!(parsed.named["text"], "solo \\ud83d aquí");
    }

    #[test]
    fn test_embedded_quotes_and_escapes() {
        let parsed = args(r#"text="ella dijo "hola" y se fue\nadiós", n=1)"#);
        assert_eq!(parsed.named["text"], "ella dijo \"hola\" y se fue\nadiós");
        assert_eq!(parsed.named["n"], json!(1));

        let parsed = args(r#"text="café \"bueno\"")"#);
        assert_eq!(parsed.named["text"], "café \"bueno\"");
    }

    #[test]
    fn test_unterminated_inputs() {
        let parsed = args("query=\"despacito letra");
        assert!(!parsed.closed);
        assert_eq!(parsed.named["query"], "despacito letra");

        let parsed = args("url=\"http://a\"");
        assert!(!parsed.closed);
        assert_eq!(parsed.named["url"], "http://a");
    }

    #[test]
    fn test_multiline_string() {
        let parsed = args("text=\"línea uno\nlínea dos\nlínea tres\")");
        assert_eq!(parsed.named["text"], "línea uno\nlínea dos\nlínea tres");
    }

    #[test]
    fn test_truncated_list_keeps_complete_items() {
        let parsed = args(r#"vocabulary=[{"spanish": "uno"}, {"spanish": "dos"}, {"spani"#);
        assert_eq!(
            parsed.named["vocabulary"],
            json!([{"spanish": "uno"}, {"spanish": "dos"}])
        );
    }

    #[test]
    fn test_positional_first_argument() {
        let parsed = args("\"despacito luis fonsi\")");
        assert_eq!(parsed.positional, Some(json!("despacito luis fonsi")));
        assert!(parsed.named.is_empty());
    }

    #[test]
    fn test_stops_at_unmatched_remainder() {
        let parsed = args("a=\"1\", ??? b=\"2\")");
        assert_eq!(parsed.named.len(), 1);
        assert_eq!(parsed.named["a"], "1");
        assert!(!parsed.closed);
    }

    #[test]
    fn test_empty_argument_list() {
        let parsed = args(")");
        assert!(parsed.closed);
        assert!(parsed.named.is_empty());
        assert!(parsed.positional.is_none());
    }
}
