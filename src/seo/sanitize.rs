//! Allowlist filter for head markup.
//!
//! Tags outside the allowlist are dropped with their text kept, disallowed
//! attributes are removed, and kept tags are re-emitted in a normalized form
//! (lowercase names, double-quoted values).

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Allowed tags and their allowed attributes.
const ALLOWED_TAGS: &[(&str, &[&str])] = &[
    ("title", &[]),
    ("meta", &["charset", "content", "http-equiv", "name", "property"]),
    ("link", &["rel", "href", "type", "hreflang", "sizes"]),
    ("script", &["type", "class"]),
];

/// Attributes holding URLs.
const URL_ATTRIBUTES: &[&str] = &["href"];

const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];

static TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?(?:-->|$)|<[^>]*(?:>|$)|>").expect("token pattern is valid"));

static ELEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<\s*(/\s*)?([A-Za-z0-9-]+)([^>]*)>?$").expect("element pattern is valid"));

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
        .expect("attribute pattern is valid")
});

static SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([A-Za-z][A-Za-z0-9+.-]*)\s*:").expect("scheme pattern is valid"));

static DASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").expect("dash pattern is valid"));

/// Keep only allowlisted tags and attributes in `head`.
pub fn sanitize_head(head: &str) -> String {
    let mut out = String::with_capacity(head.len());
    let mut last = 0;

    for token in TOKEN.find_iter(head) {
        out.push_str(&head[last..token.start()]);
        out.push_str(&filter_token(token.as_str()));
        last = token.end();
    }
    out.push_str(&head[last..]);

    out
}

fn filter_token(token: &str) -> String {
    if let Some(comment) = token.strip_prefix("<!--") {
        return filter_comment(comment);
    }
    if token == ">" {
        return "&gt;".to_string();
    }

    let Some(element) = ELEMENT.captures(token) else {
        return String::new();
    };
    let name = element[2].to_ascii_lowercase();
    let Some(allowed) = allowed_attributes(&name) else {
        return String::new();
    };

    if element.get(1).is_some() {
        return format!("</{name}>");
    }

    let raw = element.get(3).map_or("", |m| m.as_str());
    let mut out = format!("<{name}");
    let mut seen = HashSet::new();

    for attribute in ATTRIBUTE.captures_iter(raw) {
        let attr_name = attribute[1].to_ascii_lowercase();
        if !allowed.contains(&attr_name.as_str()) || !seen.insert(attr_name.clone()) {
            continue;
        }

        let value = attribute.get(2).or_else(|| attribute.get(3)).or_else(|| attribute.get(4));
        match value.map(|m| m.as_str()) {
            Some(value) if URL_ATTRIBUTES.contains(&attr_name.as_str()) && !allowed_url(value) => {}
            Some(value) => {
                out.push_str(&format!(" {attr_name}=\"{}\"", value.replace('"', "&quot;")));
            }
            None => {
                out.push(' ');
                out.push_str(&attr_name);
            }
        }
    }

    if raw.trim_end().ends_with('/') {
        out.push_str(" /");
    }
    out.push('>');

    out
}

fn filter_comment(comment: &str) -> String {
    let mut content = comment.strip_suffix("-->").unwrap_or(comment).replace("<!--", "").replace("-->", "");

    loop {
        let next = sanitize_head(&content);
        if next == content {
            break;
        }
        content = next;
    }

    if content.is_empty() {
        return String::new();
    }

    let content = DASHES.replace_all(&content, "-");
    format!("<!--{}-->", content.trim_end_matches('-'))
}

fn allowed_attributes(tag: &str) -> Option<&'static [&'static str]> {
    ALLOWED_TAGS.iter().find(|(name, _)| *name == tag).map(|(_, attributes)| *attributes)
}

fn allowed_url(value: &str) -> bool {
    match SCHEME.captures(value) {
        Some(scheme) => ALLOWED_SCHEMES.contains(&scheme[1].to_ascii_lowercase().as_str()),
        None => true,
    }
}
