//! Lyrics text cleanup

use regex::Regex;

pub const NO_LYRICS: &str = "No lyrics found for this song.";

const SITE_HEADER: &str = "Lyrics Translation Meaning";

const SITE_NOISE: [&str; 8] = [
    r"lyrics views \d+[,.]?\d*",
    r"\d+ Contributors.*?Lyrics",
    r"(?:Translations|English).*?Lyrics",
    r"\(part\. [^)]+\)",
    r"Translation Meaning.*?\n",
    r"\(Spanish Version\)",
    r"\([^)]*?ft\.[^)]*?\)",
    r"\([^)]*Remix[^)]*\)",
];

const SECTION_MARKERS: [&str; 5] = ["[verso", "[coro", "[puente", "[pre-coro", "[estribillo"];

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove lyrics-site chrome, normalise section headers and drop
/// immediately repeated lines.
pub fn clean_lyrics(raw: &str) -> String {
    let mut lyrics = match raw.rfind(SITE_HEADER) {
        Some(idx) => raw[idx + SITE_HEADER.len()..].to_string(),
        None => raw.to_string(),
    };

    for pattern in SITE_NOISE {
        if let Ok(re) = Regex::new(&format!("(?is){}", pattern)) {
            lyrics = re.replace_all(&lyrics, "").into_owned();
        }
    }

    let Ok(verse_break) = Regex::new(r"\n\s*\n") else {
        return lyrics.trim().to_string();
    };
    let paren_space = Regex::new(r"\(\s*([^)]*?)\s*\)").ok();

    let mut verses = Vec::new();
    for verse in verse_break.split(&lyrics) {
        let mut lines: Vec<String> = Vec::new();
        for line in verse.lines() {
            let line = line.trim();
            if line.is_empty()
                || line.starts_with("Contributors")
                || line.starts_with("Translations")
                || line.starts_with("[English]")
            {
                continue;
            }

            let lower = line.to_lowercase();
            if SECTION_MARKERS.iter().any(|marker| lower.contains(marker)) {
                let header = title_case(line.trim_matches(|c| c == '[' || c == ']'));
                lines.push(format!("\n[{}]", header));
                continue;
            }

            let mut line = line.split_whitespace().collect::<Vec<_>>().join(" ");
            if let Some(re) = &paren_space {
                line = re.replace_all(&line, "($1)").into_owned();
            }
            if lines.last() == Some(&line) {
                continue;
            }
            lines.push(line);
        }
        if !lines.is_empty() {
            verses.push(lines.join("\n"));
        }
    }

    let mut joined = verses
        .into_iter()
        .filter(|v| !v.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    if let Ok(blank_runs) = Regex::new(r"\n{3,}") {
        joined = blank_runs.replace_all(&joined, "\n\n").into_owned();
    }
    joined.trim().to_string()
}

/// Decode escape sequences that leaked into text as literal characters,
/// reading the text as the body of a JSON string. Quotes and line breaks
/// that are already unescaped are kept as they are. When the text is not a
/// valid JSON string body only the simple escapes are decoded.
pub fn decode_escapes(text: &str) -> String {
    if !text.contains('\\') {
        return text.to_string();
    }

    match serde_json::from_str::<String>(&as_json_literal(text)) {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::warn!("[Lyrics] Escapes are not valid JSON ({}), decoding simple escapes only", e);
            decode_simple_escapes(text)
        }
    }
}

/// Quote `text` as a JSON string literal, leaving its JSON escapes intact
fn as_json_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek().copied() {
                Some(e @ ('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' | 'u')) => {
                    chars.next();
                    out.push('\\');
                    out.push(e);
                }
                Some('\'') => {
                    chars.next();
                    out.push('\'');
                }
                _ => out.push_str("\\\\"),
            },
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() && (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn decode_simple_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('n') => {
                chars.next();
                out.push('\n');
            }
            Some('t') => {
                chars.next();
                out.push('\t');
            }
            Some(q @ ('"' | '\'' | '\\')) => {
                chars.next();
                out.push(q);
            }
            _ => out.push('\\'),
        }
    }
    out
}
