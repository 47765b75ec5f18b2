use regex::Regex;
use scraper::Html;
use std::sync::OnceLock;

const FORWARDED_MARKER: &str = "---------- Forwarded message ---------";

/// Body text ready for line-anchored field lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanedBody {
    pub text: String,
    /// `Date:` line from the last forwarded-message header block
    pub forwarded_date: Option<String>,
}

fn html_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)</?(?:html|head|body|div|p|br|table|tbody|tr|td|span|a|b|strong|font|img|meta)\b[^>]*>",
        )
        .expect("invalid html tag regex")
    })
}

fn block_end_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)<br\s*/?>|</(?:p|div|tr|li|table|h[1-6])>").expect("invalid block regex")
    })
}

fn numeric_entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&#(x?[0-9a-fA-F]+);").expect("invalid entity regex"))
}

pub fn looks_like_html(body: &str) -> bool {
    html_tag_re().find_iter(body).take(3).count() >= 3
}

/// Flattens HTML to text, keeping one line per block element.
pub fn html_to_text(html: &str) -> String {
    let with_breaks = block_end_re().replace_all(html, "$0\n");
    let document = Html::parse_document(&with_breaks);

    let mut out = String::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element().map(|el| el.name()))
            .map(|name| matches!(name, "script" | "style" | "head" | "title"))
            .unwrap_or(false);
        if !hidden {
            out.push_str(text);
        }
    }
    out
}

/// Decodes the entities that survive in plain-text parts of forwarded mail.
pub fn decode_entities(text: &str) -> String {
    let named = text
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">");

    let numeric = numeric_entity_re().replace_all(&named, |caps: &regex::Captures| {
        let code = &caps[1];
        let parsed = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse().ok(),
        };
        parsed
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });

    // `&amp;` last so `&amp;lt;` stays literal
    numeric.replace("&amp;", "&")
}

fn normalize_lines(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\u{a0}', " ")
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drops everything up to the end of the last forwarded-message header block,
/// returning the remaining text and the block's `Date:` value.
fn strip_forwarded_header(text: &str) -> (String, Option<String>) {
    let Some(marker_at) = text.rfind(FORWARDED_MARKER) else {
        return (text.to_string(), None);
    };

    let after_marker = &text[marker_at + FORWARDED_MARKER.len()..];
    let (header, rest) = match after_marker.find("\n\n") {
        Some(blank) => (&after_marker[..blank], &after_marker[blank + 2..]),
        None => (after_marker, ""),
    };

    let forwarded_date = header
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Date:"))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty());

    (rest.to_string(), forwarded_date)
}

/// Produces the text used by the body extractor.
pub fn clean_body(raw: &str) -> CleanedBody {
    let flattened = if looks_like_html(raw) {
        html_to_text(raw)
    } else {
        decode_entities(raw)
    };

    let normalized = normalize_lines(&flattened);
    let (text, forwarded_date) = strip_forwarded_header(&normalized);

    CleanedBody {
        text: text.trim().to_string(),
        forwarded_date,
    }
}
