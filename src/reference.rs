//! Reference strings
//!
//! Folder references and file version references are rendered from a
//! `ReferenceFormat` that callers pass in explicitly (it normally lives in
//! `ArborConfig`). Category paths come from the in-memory forest.

use crate::tree::Forest;
use serde::{Deserialize, Serialize};

/// Which part of the category path appears in a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryMode {
    /// Every name from the root down, joined by the separator
    All,
    /// Only the deepest name
    Last,
    /// Only the root name
    Root,
}

impl Default for CategoryMode {
    fn default() -> Self {
        CategoryMode::All
    }
}

fn default_sequence_length() -> usize {
    4
}

fn default_separator() -> String {
    "/".to_string()
}

/// Reference formatting settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceFormat {
    /// Digits the sequence number is zero-padded to
    #[serde(default = "default_sequence_length")]
    pub sequence_length: usize,

    #[serde(default)]
    pub category_mode: CategoryMode,

    #[serde(default = "default_separator")]
    pub separator: String,

    /// Optional pattern with `{seq}`, `{cat}`, `{sep}`, `{year}`, `{name}`
    #[serde(default)]
    pub pattern: String,
}

impl Default for ReferenceFormat {
    fn default() -> Self {
        Self {
            sequence_length: default_sequence_length(),
            category_mode: CategoryMode::default(),
            separator: default_separator(),
            pattern: String::new(),
        }
    }
}

impl ReferenceFormat {
    /// Padding width; an unset (zero) length falls back to the default
    pub fn effective_sequence_length(&self) -> usize {
        match self.sequence_length {
            0 => default_sequence_length(),
            n => n,
        }
    }

    /// Render a reference
    ///
    /// Without a pattern the result is `{seq}{sep}{cat}`. Each placeholder in a
    /// pattern is substituted once, at its first occurrence.
    pub fn render(&self, code: &str, categories: &[String], year: i32, name: &str) -> String {
        let seq = pad_sequence(code, self.effective_sequence_length());
        let cat = match self.category_mode {
            CategoryMode::Last => categories.last().cloned().unwrap_or_default(),
            CategoryMode::Root => categories.first().cloned().unwrap_or_default(),
            CategoryMode::All => categories.join(&self.separator),
        };

        if self.pattern.contains('{') {
            self.pattern
                .replacen("{seq}", &seq, 1)
                .replacen("{cat}", &cat, 1)
                .replacen("{sep}", &self.separator, 1)
                .replacen("{year}", &year.to_string(), 1)
                .replacen("{name}", name, 1)
        } else {
            format!("{}{}{}", seq, self.separator, cat)
        }
    }
}

/// Left-pad `code` with zeros to `width`
pub fn pad_sequence(code: &str, width: usize) -> String {
    format!("{:0>width$}", code, width = width)
}

/// Leading decimal digits of a reference, if any
fn leading_sequence(reference: &str) -> Option<u64> {
    let digits: String = reference.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Reference for a new folder named `name` under `parent` (root when `None`)
///
/// The sequence is one past the highest leading number among the siblings'
/// references.
pub fn next_folder_reference(
    forest: &Forest,
    parent: Option<&str>,
    name: &str,
    format: &ReferenceFormat,
    year: i32,
) -> String {
    let siblings = match parent {
        Some(p) => forest.children(p),
        None => forest.roots(),
    };
    let max_seq = siblings
        .iter()
        .filter_map(|id| forest.get(id))
        .filter_map(|n| n.reference.as_deref())
        .filter_map(leading_sequence)
        .max()
        .unwrap_or(0);

    let mut categories = parent.map(|p| forest.path_names(p)).unwrap_or_default();
    categories.push(name.to_string());
    format.render(&(max_seq + 1).to_string(), &categories, year, name)
}

/// Reference for the next uploaded version of `node`'s file
pub fn version_reference(forest: &Forest, node: &str, format: &ReferenceFormat, year: i32) -> Option<String> {
    let record = forest.get(node)?;
    let sequence = record.versions.len() + 1;
    let categories = forest.path_names(node);
    Some(format.render(&sequence.to_string(), &categories, year, &record.name))
}
