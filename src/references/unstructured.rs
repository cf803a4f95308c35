//! Best-effort parsing of free-text citation strings

use crate::identity::normalize::{doi_url, find_doi, find_url, find_year};
use crate::model::{AuthorDetails, Work};

/// Splits a citation string into fields
///
/// The string is cut into sentences on `". "`. A year becomes the date, a URL
/// or DOI becomes the link (and DOI). A leading sentence that reads like a
/// list of names becomes the authors; the first remaining sentence is the
/// title and the one after it the source.
pub fn parse_unstructured(text: &str) -> Work {
    let text = text.trim();
    let mut work = Work::default();

    if let Some(doi) = find_doi(text) {
        work.doi = Some(doi);
    }
    work.link = find_url(text).or_else(|| work.doi.as_deref().map(doi_url));
    work.date = find_year(text);

    let mut sentences: Vec<&str> = text
        .split(". ")
        .map(|s| s.trim().trim_end_matches('.').trim())
        .filter(|s| !s.is_empty() && !is_locator(s))
        .collect();

    if sentences.len() > 1 && looks_like_name_list(sentences[0]) {
        work.authors = split_names(sentences.remove(0));
    }

    let mut rest = sentences.into_iter();
    work.title = rest.next().map(str::to_string);
    work.source = rest.next().map(str::to_string);

    work
}

/// Sentences that only carry a DOI, URL, year, volume or page range
fn is_locator(sentence: &str) -> bool {
    let lower = sentence.to_lowercase();
    if lower.contains("doi") || lower.contains("http://") || lower.contains("https://") {
        return true;
    }
    let letters = sentence.chars().filter(|c| c.is_alphabetic()).count();
    letters < 4
}

/// Initials such as `J`, `J.Q.` or `JQ`
fn is_initials(word: &str) -> bool {
    let letters: Vec<char> = word.chars().filter(|c| *c != '.' && *c != '-').collect();
    !letters.is_empty() && letters.len() <= 3 && letters.iter().all(|c| c.is_uppercase())
}

fn name_parts(sentence: &str) -> Vec<&str> {
    sentence
        .split([',', ';', '&'])
        .flat_map(|part| part.split(" and "))
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}

fn looks_like_name_list(sentence: &str) -> bool {
    let parts = name_parts(sentence);
    if parts.is_empty() {
        return false;
    }

    let capitalized = parts.iter().all(|part| {
        let words: Vec<&str> = part.split_whitespace().collect();
        words.len() <= 4
            && words.iter().all(|word| {
                word.chars().next().is_some_and(char::is_uppercase) || word.len() <= 3
            })
    });

    let has_separator = parts.len() > 1;
    let has_initials = parts
        .iter()
        .any(|part| part.split_whitespace().any(is_initials));

    capitalized && (has_separator || has_initials)
}

/// Turns `"Smith J, Doe A"` or `"Smith, J., Doe, A"` into authors
fn split_names(sentence: &str) -> Vec<AuthorDetails> {
    let mut authors: Vec<AuthorDetails> = Vec::new();
    let mut pending_family: Option<&str> = None;

    for part in name_parts(sentence) {
        if is_initials(part) {
            if let Some(family) = pending_family.take() {
                authors.push(author(family, part));
                continue;
            }
        }
        if let Some(family) = pending_family.take() {
            authors.push(AuthorDetails::from_name(family));
        }

        let words: Vec<&str> = part.split_whitespace().collect();
        match words.split_last() {
            Some((last, rest)) if !rest.is_empty() && is_initials(last) => {
                authors.push(author(&rest.join(" "), last));
            }
            Some((_, rest)) if rest.is_empty() => pending_family = Some(part),
            _ => authors.push(AuthorDetails::from_name(part)),
        }
    }

    if let Some(family) = pending_family {
        authors.push(AuthorDetails::from_name(family));
    }

    authors
}

fn author(family: &str, initials: &str) -> AuthorDetails {
    AuthorDetails {
        full_name: Some(format!("{} {}", initials, family)),
        given_name: Some(initials.to_string()),
        family_name: Some(family.to_string()),
        ..Default::default()
    }
}
