/**
 * Vocabulary items and the parser for word-list files.
 *
 * A word-list file has one word per line:
 *
 *   가다 = go, to go
 *   오다 = come | 친구가 <b>왔어요</b>.
 *
 * The left side of `=` is the Korean word. The right side is a comma-separated list of
 * accepted English spellings, the first of which is canonical. Anything after `|` is
 * an example sentence, kept verbatim. Blank lines and lines starting with `#` are
 * ignored. A file whose first non-blank character is `[` is read as a JSON array of
 * items instead.
 */
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::common::{QuizError, Result};


/// A single translation pair.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VocabularyItem {
    pub korean: String,
    /// Comma-separated list of acceptable English spellings. The first is canonical.
    pub english: String,
    /// May contain markup, which is rendered verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}


impl VocabularyItem {
    pub fn new(korean: &str, english: &str) -> Self {
        VocabularyItem {
            korean: String::from(korean),
            english: String::from(english),
            example: None,
        }
    }

    /// Every accepted English spelling, trimmed, in the order given.
    pub fn spellings(&self) -> Vec<&str> {
        self.english
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// The spelling used for display.
    pub fn canonical_english(&self) -> &str {
        self.spellings()
            .first()
            .copied()
            .unwrap_or_else(|| self.english.trim())
    }
}


/// Load a word list from `path`, in either the line format or JSON.
pub fn load_word_list(path: &Path) -> Result<Vec<VocabularyItem>> {
    let data = fs::read_to_string(path)?;
    if data.trim_start().starts_with('[') {
        let items: Vec<VocabularyItem> = serde_json::from_str(&data)?;
        Ok(dedup(items))
    } else {
        parse(&data)
    }
}


/// Parse the line format described at the top of this module.
pub fn parse(data: &str) -> Result<Vec<VocabularyItem>> {
    let mut items = Vec::new();
    for (i, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        items.push(parse_line(line, i + 1)?);
    }
    Ok(dedup(items))
}


fn parse_line(line: &str, lineno: usize) -> Result<VocabularyItem> {
    let equal = line.find('=').ok_or_else(|| QuizError::Parse {
        line: lineno,
        message: String::from("expected '='"),
    })?;

    let korean = line[..equal].trim();
    let rest = &line[equal + 1..];
    let (english, example) = if let Some(bar) = rest.find('|') {
        (rest[..bar].trim(), Some(rest[bar + 1..].trim()))
    } else {
        (rest.trim(), None)
    };

    if korean.is_empty() {
        return Err(QuizError::Parse {
            line: lineno,
            message: String::from("missing Korean word"),
        });
    }
    if english.split(',').all(|s| s.trim().is_empty()) {
        return Err(QuizError::Parse {
            line: lineno,
            message: format!("no English spelling for '{}'", korean),
        });
    }

    Ok(VocabularyItem {
        korean: String::from(korean),
        english: String::from(english),
        example: example.filter(|e| !e.is_empty()).map(String::from),
    })
}


/// Words are identified by their Korean text, so later duplicates are dropped.
fn dedup(items: Vec<VocabularyItem>) -> Vec<VocabularyItem> {
    let mut seen = std::collections::HashSet::new();
    let mut unique = Vec::with_capacity(items.len());
    for item in items {
        if seen.insert(item.korean.clone()) {
            unique.push(item);
        } else {
            tracing::warn!(korean = %item.korean, "duplicate word in list, keeping the first");
        }
    }
    unique
}
