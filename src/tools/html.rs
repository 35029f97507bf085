//! Lyrics extraction from lyrics-site HTML
//!
//! A regex pass over the markup rather than a DOM: drop page chrome, look
//! for elements whose class or id names a lyrics container, and classify
//! each candidate as source-language text or not.

use regex::Regex;
use std::collections::HashSet;

/// Text blocks found in one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedLyrics {
    pub spanish_lyrics: Option<String>,
    pub english_lyrics: Option<String>,
    pub metadata: String,
}

const SPANISH_MARKERS: [&str; 9] = ["el", "la", "en", "de", "que", "y", "con", "por", "para"];
const MIN_PARAGRAPH_CHARS: usize = 100;
const MAX_TITLE_CHARS: usize = 100;
const PARAGRAPHS_CHECKED: usize = 5;

/// Heuristic: any common function word or any Spanish-specific character
pub fn is_primarily_spanish(text: &str) -> bool {
    let lower = text.to_lowercase();
    let has_word = lower
        .split_whitespace()
        .any(|word| SPANISH_MARKERS.contains(&word));
    has_word || text.chars().any(|c| "áéíóúñ¿¡".contains(c))
}

fn regex(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!("[Html] Bad pattern {}: {}", pattern, e);
            None
        }
    }
}

fn strip_blocks(html: &str) -> String {
    let mut out = html.to_string();
    for tag in ["script", "style", "header", "footer", "nav"] {
        if let Some(re) = regex(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")) {
            out = re.replace_all(&out, " ").into_owned();
        }
    }
    out
}

/// Decode the entities that show up in lyrics pages
pub fn decode_entities(text: &str) -> String {
    let mut out = text
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">");
    if let Some(numeric) = regex(r"&#(x[0-9a-fA-F]+|[0-9]+);") {
        out = numeric
            .replace_all(&out, |caps: &regex::Captures<'_>| {
                let code = &caps[1];
                let parsed = match code.strip_prefix('x') {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => code.parse().ok(),
                };
                parsed
                    .and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_default()
            })
            .into_owned();
    }
    // Named entities not listed above are dropped
    if let Some(named) = regex(r"&[a-zA-Z]+;") {
        out = named
            .replace_all(&out, |caps: &regex::Captures<'_>| {
                if &caps[0] == "&amp;" { "&".to_string() } else { " ".to_string() }
            })
            .into_owned();
    }
    out
}

/// Markup to text, keeping line breaks
pub fn html_to_text(fragment: &str) -> String {
    let mut text = fragment.to_string();
    if let Some(breaks) = regex(r"(?i)<br\s*/?>|</p\s*>|</div\s*>|</li\s*>") {
        text = breaks.replace_all(&text, "\n").into_owned();
    }
    if let Some(tags) = regex(r"(?s)<[^>]+>") {
        text = tags.replace_all(&text, "").into_owned();
    }
    clean_text(&decode_entities(&text))
}

/// Collapse runs of spaces within lines and blank lines between them
fn clean_text(text: &str) -> String {
    let lines: Vec<String> = text
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect();
    lines.join("\n")
}

/// Contents of every `<tag ...>` element whose opening tag matches `attr`
fn elements_matching<'a>(html: &'a str, attr: &Regex) -> Vec<&'a str> {
    let Some(open) = regex(r"(?is)<(div|section|article|pre|p|span|td)\b([^>]*)>") else {
        return Vec::new();
    };
    let mut found = Vec::new();
    for caps in open.captures_iter(html) {
        let (Some(whole), Some(tag), Some(attrs)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        if !attr.is_match(attrs.as_str()) {
            continue;
        }
        if let Some(inner) = element_body(html, whole.end(), &tag.as_str().to_ascii_lowercase()) {
            found.push(inner);
        }
    }
    found
}

/// Body of an element starting at `start`, honouring nesting of the same tag
fn element_body<'a>(html: &'a str, start: usize, tag: &str) -> Option<&'a str> {
    let pattern = format!(r"(?i)<(/?){}\b[^>]*>", regex::escape(tag));
    let re = regex(&pattern)?;
    let mut depth = 1usize;
    for caps in re.captures_iter(&html[start..]) {
        let m = caps.get(0)?;
        let closing = caps.get(1).map_or(false, |c| !c.as_str().is_empty());
        if closing {
            depth -= 1;
            if depth == 0 {
                return Some(&html[start..start + m.start()]);
            }
        } else if !m.as_str().ends_with("/>") {
            depth += 1;
        }
    }
    Some(&html[start..])
}

/// Find source-language lyrics, other-language lyrics and title metadata
pub fn extract_lyrics_from_html(html: &str) -> ExtractedLyrics {
    let cleaned = strip_blocks(html);
    let mut result = ExtractedLyrics::default();

    let container_patterns = [
        r#"(?i)class\s*=\s*["'][^"']*(lyrics?|letra|original|español|song-content|song-text|track-text|english)[^"']*["']"#,
        r#"(?i)id\s*=\s*["'][^"']*(lyrics?|letra|original|español)[^"']*["']"#,
    ];

    for pattern in container_patterns {
        let Some(attr) = regex(pattern) else { continue };
        for inner in elements_matching(&cleaned, &attr) {
            let text = html_to_text(inner);
            if text.is_empty() {
                continue;
            }
            if is_primarily_spanish(&text) {
                if result.spanish_lyrics.is_none() {
                    tracing::debug!("[Html] Found Spanish lyrics container ({} chars)", text.len());
                    result.spanish_lyrics = Some(text);
                }
            } else if result.english_lyrics.is_none() {
                tracing::debug!("[Html] Found other-language container ({} chars)", text.len());
                result.english_lyrics = Some(text);
            }
        }
    }

    if result.spanish_lyrics.is_none() {
        if let Some(para) = regex(r"(?is)<p\b[^>]*>(.*?)</p\s*>") {
            let mut paragraphs: Vec<String> = para
                .captures_iter(&cleaned)
                .filter_map(|c| c.get(1).map(|m| html_to_text(m.as_str())))
                .collect();
            paragraphs.sort_by_key(|p| std::cmp::Reverse(p.chars().count()));
            result.spanish_lyrics = paragraphs
                .into_iter()
                .take(PARAGRAPHS_CHECKED)
                .find(|p| p.chars().count() > MIN_PARAGRAPH_CHARS && is_primarily_spanish(p));
        }
    }

    if let Some(titles) = regex(r"(?is)<(h1|h2|title)\b[^>]*>(.*?)</(?:h1|h2|title)\s*>") {
        let mut seen = HashSet::new();
        let lines: Vec<String> = titles
            .captures_iter(html)
            .filter_map(|c| c.get(2).map(|m| html_to_text(m.as_str())))
            .filter(|t| !t.is_empty() && t.chars().count() < MAX_TITLE_CHARS)
            .filter(|t| seen.insert(t.clone()))
            .collect();
        result.metadata = lines.join("\n");
    }

    tracing::info!(
        "[Html] Extraction complete. Spanish lyrics: {}, other lyrics: {}",
        if result.spanish_lyrics.is_some() { "found" } else { "not found" },
        if result.english_lyrics.is_some() { "found" } else { "not found" },
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>Despacito - Luis Fonsi</title>
<script>var lyrics = "not these";</script><style>.lyrics{}</style></head>
<body><nav><div class="lyrics-nav">Menu de la página</div></nav>
<h1>Despacito</h1>
<div class="lyrics-body"><div class="verse">Sí, sabes que ya llevo un rato mirándote<br/>
Tengo que bailar contigo hoy</div></div>
<div id="english-translation" class="translation english">Yes, you know I've been looking at you<br>I have to dance with you today</div>
<footer>© 2024</footer></body></html>"#;

    #[test]
    fn test_extracts_containers() {
        let extracted = extract_lyrics_from_html(PAGE);
        assert_eq!(
            extracted.spanish_lyrics.as_deref(),
            Some("Sí, sabes que ya llevo un rato mirándote\nTengo que bailar contigo hoy")
        );
        assert_eq!(
            extracted.english_lyrics.as_deref(),
            Some("Yes, you know I've been looking at you\nI have to dance with you today")
        );
        assert_eq!(extracted.metadata, "Despacito - Luis Fonsi\nDespacito");
    }

    #[test]
    fn test_paragraph_fallback() {
        let long = "Yo no sé mañana si estaremos juntos, si se acaba el mundo, yo no sé si soy para ti, si serás para mí, si nos vamos a amar";
        let html = format!("<body><p>short</p><p>{}</p></body>", long);
        let extracted = extract_lyrics_from_html(&html);
        assert_eq!(extracted.spanish_lyrics.as_deref(), Some(long));
        assert!(extracted.english_lyrics.is_none());
    }

    #[test]
    fn test_no_lyrics() {
        let extracted = extract_lyrics_from_html("<body><p>Hello world</p></body>");
        assert!(extracted.spanish_lyrics.is_none());
        assert_eq!(extracted.metadata, "");
    }

    #[test]
    fn test_entities() {
        assert_eq!(decode_entities("coraz&oacute;n &amp; &#243;&#xF1;"), "coraz n & óñ");
        assert_eq!(html_to_text("a&nbsp;&nbsp;b<br>c"), "a b\nc");
    }

    #[test]
    fn test_spanish_heuristic() {
        assert!(is_primarily_spanish("Baila conmigo en la playa"));
        assert!(is_primarily_spanish("¡Ay!"));
        assert!(!is_primarily_spanish("Dance with me on the beach"));
    }
}
