// ABOUTME: Utility functions for slugging, titles, counters and dates
// ABOUTME: Provides consistent filename generation and document statistics

use crate::model::UNTITLED;
use crate::node::{rendered_text, RichNode};
use chrono::{DateTime, Local, Utc};
use std::fmt;

const TITLE_MAX_CHARS: usize = 20;

pub fn slugify(text: &str) -> String {
    slug::slugify(text)
}

/// Slug with `_` separators, suitable as an export file stem.
pub fn filename_stem(text: &str) -> String {
    slugify(text).replace('-', "_")
}

/// Title derived from the first line of a document's text.
pub fn title_from_text(text: &str) -> String {
    let first = text.lines().next().unwrap_or("").trim();
    let title: String = first.chars().take(TITLE_MAX_CHARS).collect();
    let title = title.trim_end();
    if title.is_empty() {
        UNTITLED.to_string()
    } else {
        title.to_string()
    }
}

pub fn format_date(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counter {
    pub words: usize,
    pub paragraphs: usize,
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} words, {} paragraphs", self.words, self.paragraphs)
    }
}

pub fn count(forest: &[RichNode]) -> Counter {
    count_text(&rendered_text(forest))
}

/// Paragraphs are runs of non-blank lines.
pub fn count_text(text: &str) -> Counter {
    let words = text.split_whitespace().count();

    let mut paragraphs = 0;
    let mut in_paragraph = false;
    for line in text.lines() {
        let blank = line.trim().is_empty();
        if !blank && !in_paragraph {
            paragraphs += 1;
        }
        in_paragraph = !blank;
    }

    Counter { words, paragraphs }
}


#[cfg(test)]
mod title_tests {
    use super::*;

    #[test]
    fn test_title_first_line() {
        assert_eq!(title_from_text("Groceries\nmilk\neggs"), "Groceries");
    }

    #[test]
    fn test_title_truncated() {
        assert_eq!(
            title_from_text("A rather long opening line of prose"),
            "A rather long openin"
        );
        assert_eq!(title_from_text("ééééééééééééééééééééééé").chars().count(), 20);
    }

    #[test]
    fn test_title_blank_falls_back() {
        assert_eq!(title_from_text(""), UNTITLED);
        assert_eq!(title_from_text("   \nsecond"), UNTITLED);
    }
}

#[cfg(test)]
mod counter_tests {
    use super::*;
    use crate::parse::parse_markdown;

    #[test]
    fn test_count_text() {
        let c = count_text("one two\nthree\n\n\nfour five six\n");
        assert_eq!(c, Counter { words: 6, paragraphs: 2 });
    }

    #[test]
    fn test_count_empty() {
        assert_eq!(count(&[]), Counter::default());
        assert_eq!(Counter::default().to_string(), "0 words, 0 paragraphs");
    }

    #[test]
    fn test_count_parsed_document() {
        let nodes = parse_markdown("# Title\nfirst line\nsecond line\n\nnext para");
        let c = count(&nodes);
        assert_eq!(c.words, 7);
        assert_eq!(c.paragraphs, 3);
        assert_eq!(c.to_string(), "7 words, 3 paragraphs");
    }
}
