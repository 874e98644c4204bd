//! YAML normalization for the `yaml format` command.

use serde::Deserialize;

use crate::error::Result;

/// One line that differs between the original and formatted text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineChange {
    /// 1-based line number
    pub line: usize,
    pub original: String,
    pub formatted: String,
}

/// Parse every document in `text` and re-serialize it, indenting nested
/// levels by `indent` spaces.
///
/// # Errors
///
/// Returns `AppError::Yaml` when any document fails to parse.
pub fn format_yaml(text: &str, indent: usize) -> Result<String> {
    if text.trim().is_empty() {
        return Ok(String::new());
    }

    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = serde_yaml::Value::deserialize(document)?;
        documents.push(serde_yaml::to_string(&value)?);
    }

    let joined = documents.join("---\n");
    Ok(reindent(&joined, indent))
}

/// serde_yaml emits two-space levels; scale them to `indent`
fn reindent(yaml: &str, indent: usize) -> String {
    let mut result = String::with_capacity(yaml.len());
    for line in yaml.lines() {
        let trimmed = line.trim_start_matches(' ');
        if trimmed.is_empty() {
            result.push('\n');
            continue;
        }
        let depth = line.len() - trimmed.len();
        let width = (depth / 2) * indent + depth % 2;
        result.extend(std::iter::repeat_n(' ', width));
        result.push_str(trimmed);
        result.push('\n');
    }

    let end = result.trim_end_matches('\n').len();
    result.truncate(end);
    result.push('\n');
    result
}

/// Line-by-line differences, for dry runs
pub fn changed_lines(original: &str, formatted: &str) -> Vec<LineChange> {
    let before: Vec<&str> = original.split('\n').collect();
    let after: Vec<&str> = formatted.split('\n').collect();

    (0..before.len().max(after.len()))
        .filter_map(|index| {
            let old = before.get(index).copied().unwrap_or_default();
            let new = after.get(index).copied().unwrap_or_default();
            (old != new).then(|| LineChange {
                line: index + 1,
                original: old.to_string(),
                formatted: new.to_string(),
            })
        })
        .collect()
}
