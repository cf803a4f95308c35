//! Text normalization shared by identity generation and matching

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum length of the unique-identifier fragment appended to an ID
pub const UID_FRAGMENT_LEN: usize = 30;

/// Prefixes removed from DOIs, links and persistent identifiers, in order
const IDENTIFIER_PREFIXES: &[&str] = &[
    "https://",
    "http://",
    "dx.",
    "www.",
    "doi.org/",
    "orcid.org/",
    "ror.org/",
    "doi:",
    "isbn:",
    "issn:",
];

static DOI_IN_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(10\.\d{1,9}/[^\s"<>]+)"#).expect("DOI pattern is valid")
});

static URL_IN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bhttps?://[^\s"<>]+"#).expect("URL pattern is valid"));

static YEAR_IN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(1[5-9]\d{2}|20\d{2})[a-z]?\b").expect("year pattern is valid"));

/// Lowercases and strips resolver/scheme prefixes from an identifier
pub fn strip_identifier_prefixes(raw: &str) -> String {
    let mut value = raw.trim().to_lowercase();
    for prefix in IDENTIFIER_PREFIXES {
        if let Some(rest) = value.strip_prefix(prefix) {
            value = rest.trim_start().to_string();
        }
    }
    value.trim_end_matches('/').to_string()
}

/// Bare, lowercased DOI (`10.xxxx/...`) or `None` if the text holds no DOI
pub fn bare_doi(raw: &str) -> Option<String> {
    let stripped = strip_identifier_prefixes(raw);
    if stripped.starts_with("10.") && stripped.contains('/') {
        return Some(stripped);
    }
    find_doi(raw).map(|doi| doi.to_lowercase())
}

/// Extracts the DOI from a DOI-resolver link (`https://doi.org/10.1/x`)
pub fn doi_from_link(link: &str) -> Option<String> {
    let lower = link.trim().to_lowercase();
    let (_, path) = lower.split_once("doi.org/")?;
    let path = path.trim_end_matches('/');
    if path.starts_with("10.") && path.contains('/') {
        Some(path.to_string())
    } else {
        None
    }
}

/// Canonical resolver URL for a DOI
pub fn doi_url(doi: &str) -> String {
    format!("https://doi.org/{}", strip_identifier_prefixes(doi))
}

/// First DOI found anywhere in free text, trailing punctuation trimmed
pub fn find_doi(text: &str) -> Option<String> {
    DOI_IN_TEXT.captures(text).map(|caps| {
        caps[1]
            .trim_end_matches(['.', ',', ';', ':', ')', ']'])
            .to_string()
    })
}

/// First http(s) URL found in free text, trailing punctuation trimmed
pub fn find_url(text: &str) -> Option<String> {
    URL_IN_TEXT.find(text).map(|m| {
        m.as_str()
            .trim_end_matches(['.', ',', ';', ')', ']'])
            .to_string()
    })
}

/// First plausible publication year in free text
pub fn find_year(text: &str) -> Option<String> {
    YEAR_IN_TEXT.captures(text).map(|caps| caps[1].to_string())
}

/// Lowercase alphanumeric words of `text`
pub fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// A name as a single lowercase, hyphen-joined token
pub fn name_token(name: &str) -> String {
    tokens(name).join("-")
}

/// First two words plus the last word of a title, hyphen-joined
pub fn title_fingerprint(title: &str) -> Option<String> {
    let words = tokens(title);
    match words.len() {
        0 => None,
        1..=3 => Some(words.join("-")),
        n => Some(format!("{}-{}-{}", words[0], words[1], words[n - 1])),
    }
}

/// All words of a text, lowercase and space-joined; used for equality checks
pub fn comparable_text(text: &str) -> String {
    tokens(text).join(" ")
}

/// Truncated identifier fragment with prefixes stripped
pub fn uid_fragment(raw: &str) -> Option<String> {
    let stripped = strip_identifier_prefixes(raw);
    let fragment: String = stripped.chars().take(UID_FRAGMENT_LEN).collect();
    Some(fragment).filter(|f| !f.is_empty())
}

/// Canonical ID body: lowercase, `[a-z0-9-./_]` only, no repeated or edge hyphens
pub fn clean_id(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    for c in raw.to_lowercase().chars() {
        if c.is_whitespace() {
            cleaned.push('-');
        } else if c.is_alphanumeric() || matches!(c, '-' | '.' | '/' | '_') {
            cleaned.push(c);
        }
    }

    let mut collapsed = String::with_capacity(cleaned.len());
    for c in cleaned.chars() {
        if c == '-' && collapsed.ends_with('-') {
            continue;
        }
        collapsed.push(c);
    }

    collapsed.trim_matches('-').to_string()
}
