//! XSLT-driven XML to YAML transformation.
//!
//! The stylesheet does the structural work; [`clean_yaml_output`] then
//! normalizes whitespace and fills in bare keys so the text parses as the
//! mapping the stylesheet intended.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use regex::{Captures, Regex};
use tracing::{debug, info};

use crate::error::{TransformError, TransformResult};
use crate::libxslt::LibXsltWrapper;

/// The XML to YAML transformation seam
#[cfg_attr(test, mockall::automock)]
pub trait Transform: Send + Sync {
    /// Transform the XML file at `xml_path` with the stylesheet at `xslt_path`
    fn transform_file(&self, xml_path: &Path, xslt_path: &Path) -> TransformResult<String>;

    /// Transform in-memory XML text with the stylesheet at `xslt_path`
    fn transform_content(&self, xml: &str, xslt_path: &Path) -> TransformResult<String>;
}

/// libxslt-backed transformer
#[derive(Debug, Default)]
pub struct XsltTransformer {
    engine: LibXsltWrapper,
}

impl XsltTransformer {
    pub fn new() -> Self {
        Self {
            engine: LibXsltWrapper::new(),
        }
    }

    fn transform_bytes(&self, xml: &[u8], xslt_path: &Path) -> TransformResult<String> {
        if !xslt_path.is_file() {
            return Err(TransformError::StylesheetNotFound {
                path: xslt_path.to_path_buf(),
            });
        }

        let raw = self.engine.transform_memory(xml, xslt_path)?;
        debug!(bytes = raw.len(), stylesheet = %xslt_path.display(), "Stylesheet applied");
        Ok(clean_yaml_output(&raw))
    }
}

impl Transform for XsltTransformer {
    fn transform_file(&self, xml_path: &Path, xslt_path: &Path) -> TransformResult<String> {
        let xml = std::fs::read(xml_path)?;
        self.transform_bytes(&xml, xslt_path)
    }

    fn transform_content(&self, xml: &str, xslt_path: &Path) -> TransformResult<String> {
        self.transform_bytes(xml.as_bytes(), xslt_path)
    }
}

static BARE_KEY_REGEX: OnceLock<Regex> = OnceLock::new();
static BLOCK_SCALAR_REGEX: OnceLock<Regex> = OnceLock::new();

fn bare_key_regex() -> &'static Regex {
    BARE_KEY_REGEX.get_or_init(|| {
        Regex::new(r#"^(?P<indent> *)(?P<dash>- +)?(?P<key>[^\s#:\-'"][^#:]*|"[^"]*"|'[^']*'):$"#)
            .expect("bare key pattern is a valid regex")
    })
}

fn block_scalar_regex() -> &'static Regex {
    BLOCK_SCALAR_REGEX.get_or_init(|| {
        Regex::new(r"(?:^\s*-|:)\s+[|>][-+1-9]*$|^\s*-?\s*[|>][-+1-9]*$")
            .expect("block scalar pattern is a valid regex")
    })
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

/// Column where the key of a bare-key match starts
fn key_column(captures: &Captures<'_>) -> usize {
    let indent = captures.name("indent").map_or(0, |m| m.len());
    let dash = captures.name("dash").map_or(0, |m| m.len());
    indent + dash
}

/// Whether the key at `index` owns the block that follows it
fn owns_block(lines: &[&str], index: usize, column: usize) -> bool {
    let next = lines[index + 1..]
        .iter()
        .find(|line| !line.is_empty() && !is_comment(line));

    match next {
        Some(next) => {
            let depth = indentation(next);
            let item = next.trim_start();
            depth > column || (depth == column && (item == "-" || item.starts_with("- ")))
        }
        None => false,
    }
}

/// Normalize raw stylesheet output into clean YAML text.
///
/// Line endings become `\n`, trailing whitespace and leading blank lines are
/// removed, runs of blank lines collapse to one, and a bare `key:` that owns
/// no nested block becomes `key: ""`. Lines inside block scalars and comments
/// are never rewritten. Non-empty output ends with exactly one newline; blank
/// input yields the empty string. Applying it twice changes nothing.
pub fn clean_yaml_output(raw: &str) -> String {
    let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");

    let mut lines: Vec<&str> = Vec::new();
    for line in normalized.split('\n').map(str::trim_end) {
        let previous_blank = lines.last().is_none_or(|last: &&str| last.is_empty());
        if line.is_empty() && previous_blank {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|last| last.is_empty()) {
        lines.pop();
    }
    if lines.is_empty() {
        return String::new();
    }
    // output starts at column 0; the stylesheet's own indentation leaks in otherwise
    lines[0] = lines[0].trim_start();

    let mut cleaned = String::with_capacity(normalized.len() + 16);
    let mut block_owner: Option<usize> = None;

    for (index, line) in lines.iter().enumerate() {
        let depth = indentation(line);

        if let Some(owner) = block_owner {
            if line.is_empty() || depth > owner {
                cleaned.push_str(line);
                cleaned.push('\n');
                continue;
            }
            block_owner = None;
        }

        if is_comment(line) {
            cleaned.push_str(line);
        } else if block_scalar_regex().is_match(line) {
            block_owner = Some(depth);
            cleaned.push_str(line);
        } else {
            match bare_key_regex().captures(line) {
                Some(captures) if !owns_block(&lines, index, key_column(&captures)) => {
                    cleaned.push_str(line);
                    cleaned.push_str(" \"\"");
                }
                _ => cleaned.push_str(line),
            }
        }
        cleaned.push('\n');
    }

    cleaned
}

fn join_error(err: tokio::task::JoinError) -> TransformError {
    TransformError::Task {
        details: err.to_string(),
    }
}

/// Transform an XML file, running the engine on the blocking pool
pub async fn transform(
    xml_path: impl AsRef<Path>,
    xslt_path: impl AsRef<Path>,
) -> TransformResult<String> {
    let xml_path = xml_path.as_ref().to_path_buf();
    let xslt_path = xslt_path.as_ref().to_path_buf();
    run_blocking(Arc::new(XsltTransformer::new()), move |engine| {
        engine.transform_file(&xml_path, &xslt_path)
    })
    .await
}

/// Transform XML text, running the engine on the blocking pool
pub async fn transform_content(
    xml: impl Into<String>,
    xslt_path: impl AsRef<Path>,
) -> TransformResult<String> {
    let xml = xml.into();
    let xslt_path = xslt_path.as_ref().to_path_buf();
    run_blocking(Arc::new(XsltTransformer::new()), move |engine| {
        engine.transform_content(&xml, &xslt_path)
    })
    .await
}

pub(crate) async fn run_blocking<T, F>(engine: Arc<T>, work: F) -> TransformResult<String>
where
    T: Transform + ?Sized + 'static,
    F: FnOnce(&T) -> TransformResult<String> + Send + 'static,
{
    tokio::task::spawn_blocking(move || work(engine.as_ref()))
        .await
        .map_err(join_error)?
}

/// Transform `xml_path` and write the cleaned YAML to `output_path`,
/// creating its parent directory when needed
pub async fn transform_to_file<T>(
    engine: Arc<T>,
    xml_path: &Path,
    xslt_path: &Path,
    output_path: &Path,
) -> TransformResult<PathBuf>
where
    T: Transform + ?Sized + 'static,
{
    let xml = xml_path.to_path_buf();
    let xslt = xslt_path.to_path_buf();
    let yaml = run_blocking(engine, move |engine| engine.transform_file(&xml, &xslt)).await?;

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(output_path, yaml.as_bytes()).await?;
    info!(output = %output_path.display(), bytes = yaml.len(), "YAML written");

    Ok(output_path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const YAML_XSLT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
  <xsl:output method="text" encoding="UTF-8"/>
  <xsl:template match="/workflow">


name: <xsl:value-of select="@name"/>
on:
  push:
jobs:
  <xsl:value-of select="job/@id"/>:
    runs-on: ubuntu-latest
  </xsl:template>
</xsl:stylesheet>"#;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_cleanup_normalizes_whitespace() {
        let raw = "\r\n\n\nname: CI  \r\n\n\n\njobs:\r  build:\n    runs-on: x\t\n\n\n";
        assert_eq!(
            clean_yaml_output(raw),
            "name: CI\n\njobs:\n  build:\n    runs-on: x\n"
        );
    }

    #[test]
    fn test_cleanup_strips_leading_indentation() {
        let raw = "\n    name: CI\non:\n  push:\n";
        assert_eq!(clean_yaml_output(raw), "name: CI\non:\n  push: \"\"\n");
    }

    #[test]
    fn test_cleanup_quotes_bare_leaf_keys() {
        let raw = "on:\n  push:\n  pull_request:\njobs:\n  build:\n    runs-on: ubuntu-latest\n";
        assert_eq!(
            clean_yaml_output(raw),
            "on:\n  push: \"\"\n  pull_request: \"\"\njobs:\n  build:\n    runs-on: ubuntu-latest\n"
        );
    }

    #[test]
    fn test_cleanup_keeps_keys_owning_sequences() {
        let raw = "steps:\n- uses: actions/checkout@v4\n- name: build\n  with:\n    key: v\n  env:\n";
        assert_eq!(
            clean_yaml_output(raw),
            "steps:\n- uses: actions/checkout@v4\n- name: build\n  with:\n    key: v\n  env: \"\"\n"
        );
    }

    #[test]
    fn test_cleanup_leaves_block_scalars_and_comments() {
        let raw = "run: |\n  echo start\n  label:\n\n  done:\n# note:\nafter:\n";
        assert_eq!(
            clean_yaml_output(raw),
            "run: |\n  echo start\n  label:\n\n  done:\n# note:\nafter: \"\"\n"
        );
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let samples = [
            "name: CI\non:\n  push:\njobs:\n  build:\n    steps:\n      - run: |\n          a:\n\n          b\n      - name: x\n",
            "\n\n  \nkey:\n\n\n\nother: 1\n",
            "",
            "   \n",
        ];
        for sample in samples {
            let once = clean_yaml_output(sample);
            assert_eq!(clean_yaml_output(&once), once, "not a fixed point: {sample:?}");
        }
    }

    #[test]
    fn test_cleanup_of_blank_input() {
        assert_eq!(clean_yaml_output(""), "");
        assert_eq!(clean_yaml_output("\r\n \n\t\n"), "");
    }

    #[test]
    fn test_transform_content_with_stylesheet() {
        let temp_dir = TempDir::new().unwrap();
        let xslt = write(&temp_dir, "wf.xslt", YAML_XSLT);

        let yaml = XsltTransformer::new()
            .transform_content(r#"<workflow name="CI"><job id="build"/></workflow>"#, &xslt)
            .unwrap();

        assert_eq!(
            yaml,
            "name: CI\non:\n  push: \"\"\njobs:\n  build:\n    runs-on: ubuntu-latest\n"
        );
        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert!(parsed.get("jobs").is_some());
    }

    #[test]
    fn test_malformed_xml_is_propagated() {
        let temp_dir = TempDir::new().unwrap();
        let xslt = write(&temp_dir, "wf.xslt", YAML_XSLT);

        let err = XsltTransformer::new()
            .transform_content("<workflow name=", &xslt)
            .unwrap_err();
        assert!(matches!(err, TransformError::XmlSyntax { .. }));

        let err = XsltTransformer::new()
            .transform_content("", &xslt)
            .unwrap_err();
        assert!(matches!(err, TransformError::XmlSyntax { .. }));
    }

    #[test]
    fn test_missing_stylesheet() {
        let err = XsltTransformer::new()
            .transform_content("<workflow/>", Path::new("/nonexistent/wf.xslt"))
            .unwrap_err();
        assert!(matches!(err, TransformError::StylesheetNotFound { .. }));
        assert_eq!(err.to_string(), "XSLT transform file not found: /nonexistent/wf.xslt");
    }

    #[test]
    fn test_invalid_stylesheet() {
        let temp_dir = TempDir::new().unwrap();
        let xslt = write(&temp_dir, "broken.xslt", "<xsl:stylesheet");

        let err = XsltTransformer::new()
            .transform_content("<workflow/>", &xslt)
            .unwrap_err();
        assert!(matches!(
            err,
            TransformError::StylesheetParseFailed { details: Some(_), .. }
        ));
        let message = err.to_string();
        assert!(message.starts_with(&format!("Invalid XSLT stylesheet: {}: ", xslt.display())));
    }

    #[tokio::test]
    async fn test_async_transform_and_write() {
        let temp_dir = TempDir::new().unwrap();
        let xslt = write(&temp_dir, "wf.xslt", YAML_XSLT);
        let xml = write(
            &temp_dir,
            "wf.xml",
            r#"<workflow name="Release"><job id="ship"/></workflow>"#,
        );

        let yaml = transform(&xml, &xslt).await.unwrap();
        assert!(yaml.starts_with("name: Release\n"));

        let output = temp_dir.path().join("out/nested/wf.yml");
        let written = transform_to_file(Arc::new(XsltTransformer::new()), &xml, &xslt, &output)
            .await
            .unwrap();
        assert_eq!(written, output);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), yaml);
    }

    #[tokio::test]
    async fn test_async_transform_content_errors() {
        let result = transform_content("<a/>", "/nonexistent/wf.xslt").await;
        assert!(matches!(result, Err(TransformError::StylesheetNotFound { .. })));
    }
}
