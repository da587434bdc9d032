//! Report renderer - output formatting and export
//!
//! Supports two output formats:
//! - JSON (pretty-printed)
//! - Text (indented key/value tree for terminals)

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use serde_json::Value;

use crate::config::OutputFormat;
use crate::utils::{ReportError, Result};

const INDENT: &str = "  ";

/// Report renderer
pub struct ReportRenderer {
    format: OutputFormat,
}

impl ReportRenderer {
    /// Create new renderer with specified format
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render a report value as a string
    pub fn render(&self, report: &Value) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(report).map_err(|e| ReportError::Render(e.to_string()))
            }
            OutputFormat::Text => Ok(render_text(report)),
        }
    }

    /// Write the rendered report to stdout
    pub fn print(&self, report: &Value) -> Result<()> {
        let rendered = self.render(report)?;
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", rendered).map_err(|e| ReportError::Render(e.to_string()))
    }

    /// Write the rendered report to a file
    pub fn write_file(&self, path: &Path, report: &Value) -> Result<()> {
        let rendered = self.render(report)?;
        let mut file = File::create(path)
            .map_err(|e| ReportError::Render(format!("{}: {}", path.display(), e)))?;
        writeln!(file, "{}", rendered)
            .map_err(|e| ReportError::Render(format!("{}: {}", path.display(), e)))
    }
}

/// Render a value as an indented tree
pub fn render_text(value: &Value) -> String {
    let mut out = String::new();
    match value {
        Value::Object(_) | Value::Array(_) => write_nested(&mut out, value, 0),
        scalar => out.push_str(&scalar_text(scalar)),
    }
    out.trim_end().to_string()
}

fn write_nested(out: &mut String, value: &Value, depth: usize) {
    let pad = INDENT.repeat(depth);
    match value {
        Value::Object(map) if map.is_empty() => out.push_str(&format!("{}(none)\n", pad)),
        Value::Object(map) => {
            for (key, child) in map {
                if is_leaf(child) {
                    out.push_str(&format!("{}{}: {}\n", pad, key, scalar_text(child)));
                } else {
                    out.push_str(&format!("{}{}:\n", pad, key));
                    write_nested(out, child, depth + 1);
                }
            }
        }
        Value::Array(items) if items.is_empty() => out.push_str(&format!("{}(none)\n", pad)),
        Value::Array(items) => {
            for item in items {
                if is_leaf(item) {
                    out.push_str(&format!("{}- {}\n", pad, scalar_text(item)));
                } else {
                    out.push_str(&format!("{}-\n", pad));
                    write_nested(out, item, depth + 1);
                }
            }
        }
        scalar => out.push_str(&format!("{}{}\n", pad, scalar_text(scalar))),
    }
}

/// Scalars, and containers that are empty, print on one line
fn is_leaf(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => true,
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        Value::Object(_) => "{}".to_string(),
        Value::Array(_) => "[]".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_render() {
        let renderer = ReportRenderer::new(OutputFormat::Json);
        let rendered = renderer.render(&json!({ "total": 3 })).unwrap();
        assert_eq!(rendered, "{\n  \"total\": 3\n}");
    }

    #[test]
    fn test_text_render_tree() {
        let value = json!({
            "total": 12,
            "shards": [
                { "shard": "s1", "chunks": 8 },
                { "shard": "s2", "chunks": 4 }
            ],
            "imbalances": {},
            "version": null
        });
        let expected = "\
total: 12
shards:
  -
    shard: s1
    chunks: 8
  -
    shard: s2
    chunks: 4
imbalances: {}
version: -";
        assert_eq!(render_text(&value), expected);
    }

    #[test]
    fn test_text_render_scalar_section() {
        assert_eq!(render_text(&json!(42)), "42");
        assert_eq!(render_text(&json!([])), "(none)");
        assert_eq!(render_text(&json!(["a", "b"])), "- a\n- b");
    }
}
