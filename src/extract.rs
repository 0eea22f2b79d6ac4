//! Recover review fields from the free text of an issue.
//!
//! Bodies are read as lines. A label line has the shape
//! `[bullet] [**]Label[**]: [**]value`, where the bullet is `-`, `*` or `•`
//! and labels match case-insensitively. Every field has a fallback, so a body
//! that ignores the template still yields a record; nothing here fails.
//!
//! | field   | lookup order                                             | fallback                      |
//! |---------|----------------------------------------------------------|-------------------------------|
//! | name    | title `Review from <name> - ...`, then `Name:`           | `Anonymous`                   |
//! | email   | `Email:`                                                 | empty                         |
//! | rating  | `Rating:` leading digits, `<d> stars` anywhere, `<d>-star` label | `5`                   |
//! | tour    | `Tour:` or `Tour Taken:`                                 | `Not specified`               |
//! | content | after `Review:`/`Feedback:` up to a blank line followed by a label line | body minus metadata lines |

use std::sync::LazyLock;

use regex::Regex;

use crate::review::{DEFAULT_NAME, DEFAULT_TOUR, Rating};

pub const NO_CONTENT: &str = "No review content available";

const METADATA_LABELS: &[&str] = &["name", "email", "rating", "tour", "tour taken"];
const CONTENT_MARKERS: &[&str] = &["review", "feedback"];

static LABEL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*•]\s+)?\**\s*([A-Za-z][A-Za-z ]*?)\s*\**\s*:\s*\**\s*(.*?)\s*$").unwrap()
});
static TITLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)review from\s+(.+?)(?:\s+-|$)").unwrap());
static LEADING_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(\d+)").unwrap());
static INLINE_STARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d)\s*stars?\b").unwrap());
static STAR_LABEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d)-star$").unwrap());
static SECTION_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:-{3,}|\*{3,}|_{3,})\s*$").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFields {
    pub name: String,
    pub email: String,
    pub rating: Rating,
    pub tour: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Line<'a> {
    Blank,
    /// Markdown horizontal rule; ends the review section.
    Rule,
    Label { key: String, value: String },
    Text(&'a str),
}

fn classify(raw: &str) -> Line<'_> {
    if raw.trim().is_empty() {
        return Line::Blank;
    }
    if SECTION_RULE.is_match(raw) {
        return Line::Rule;
    }
    match LABEL_LINE.captures(raw) {
        Some(cap) => Line::Label {
            key: cap[1].trim().to_lowercase(),
            value: cap[2].trim_end_matches('*').trim().to_string(),
        },
        None => Line::Text(raw),
    }
}

fn lines(body: &str) -> Vec<(&str, Line<'_>)> {
    body.lines().map(|raw| (raw, classify(raw))).collect()
}

fn label_value<'l>(lines: &'l [(&str, Line<'_>)], keys: &[&str]) -> Option<&'l str> {
    lines.iter().find_map(|(_, line)| match line {
        Line::Label { key, value } if keys.contains(&key.as_str()) && !value.is_empty() => {
            Some(value.as_str())
        }
        _ => None,
    })
}

/// Extract every field from an issue's title, body and label names.
pub fn extract(title: &str, body: &str, labels: &[String]) -> ExtractedFields {
    let lines = lines(body);
    ExtractedFields {
        name: extract_name(title, &lines),
        email: label_value(&lines, &["email"]).unwrap_or_default().to_string(),
        rating: extract_rating(body, &lines, labels),
        tour: label_value(&lines, &["tour", "tour taken"])
            .unwrap_or(DEFAULT_TOUR)
            .to_string(),
        content: extract_content(&lines),
    }
}

fn extract_name(title: &str, lines: &[(&str, Line<'_>)]) -> String {
    if let Some(cap) = TITLE_NAME.captures(title) {
        let name = cap[1].trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }
    label_value(lines, &["name"])
        .unwrap_or(DEFAULT_NAME)
        .to_string()
}

fn extract_rating(body: &str, lines: &[(&str, Line<'_>)], labels: &[String]) -> Rating {
    let from_label_line = label_value(lines, &["rating"])
        .and_then(|v| LEADING_DIGITS.captures(v))
        .and_then(|cap| cap[1].parse::<u8>().ok())
        .and_then(Rating::new);
    if let Some(rating) = from_label_line {
        return rating;
    }

    let inline = INLINE_STARS
        .captures_iter(body)
        .find_map(|cap| cap[1].parse::<u8>().ok().and_then(Rating::new));
    if let Some(rating) = inline {
        return rating;
    }

    labels
        .iter()
        .find_map(|label| {
            STAR_LABEL
                .captures(label)
                .and_then(|cap| cap[1].parse::<u8>().ok())
                .and_then(Rating::new)
        })
        .unwrap_or_default()
}

fn extract_content(lines: &[(&str, Line<'_>)]) -> String {
    let marker = lines.iter().position(|(_, line)| {
        matches!(line, Line::Label { key, .. } if CONTENT_MARKERS.contains(&key.as_str()))
    });

    if let Some(start) = marker {
        let mut collected: Vec<&str> = Vec::new();
        if let Line::Label { value, .. } = &lines[start].1
            && !value.is_empty()
        {
            collected.push(value.as_str());
        }

        let mut previous_blank = false;
        for (raw, line) in &lines[start + 1..] {
            match line {
                Line::Rule => break,
                Line::Label { .. } if previous_blank => break,
                Line::Blank => previous_blank = true,
                _ => previous_blank = false,
            }
            collected.push(*raw);
        }

        let content = collected.join("\n").trim().to_string();
        if !content.is_empty() {
            return content;
        }
    }

    let remainder: Vec<&str> = lines
        .iter()
        .filter(|(_, line)| match line {
            Line::Rule => false,
            Line::Label { key, .. } => !METADATA_LABELS.contains(&key.as_str()),
            _ => true,
        })
        .map(|(raw, _)| *raw)
        .collect();
    let content = remainder.join("\n").trim().to_string();
    if content.is_empty() {
        NO_CONTENT.to_string()
    } else {
        content
    }
}
