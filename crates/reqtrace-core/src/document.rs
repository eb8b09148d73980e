//! Ordered document model and parsers for the transition spec format.
//!
//! The spec document is a small YAML-shaped file: top-level keys holding
//! scalars, one mapping block (metadata), and one sequence of flat mappings
//! (the transitions), whose values may be one-level-deeper scalar sequences.
//! Two parsers produce the same [`DocValue`] tree for that subset:
//!
//! - with the `yaml` feature (default), the general-purpose `serde_yaml`
//!   parser handles the full format;
//! - without it, [`parse_subset`] is a zero-dependency fallback that
//!   understands exactly the subset above and nothing more.
//!
//! [`parse_document`] is the capability-checked front door that picks
//! between them.

use eyre::{Result, WrapErr};
use std::path::Path;
use tracing::debug;

/// An ordered document value.
///
/// Mappings preserve insertion order; this is load-bearing for report
/// stability, so a plain `Vec` of pairs is used instead of a hash map.
#[derive(Debug, Clone, PartialEq)]
pub enum DocValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Vec<DocValue>),
    Map(Vec<(String, DocValue)>),
}

impl DocValue {
    /// Look up a key in a mapping value.
    pub fn get(&self, key: &str) -> Option<&DocValue> {
        match self {
            DocValue::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DocValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DocValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[DocValue]> {
        match self {
            DocValue::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(String, DocValue)]> {
        match self {
            DocValue::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Render a scalar as plain text (containers and null render empty).
    pub fn scalar_string(&self) -> String {
        match self {
            DocValue::Null => String::new(),
            DocValue::Bool(b) => b.to_string(),
            DocValue::Int(n) => n.to_string(),
            DocValue::Float(x) => float_literal(*x),
            DocValue::Str(s) => s.clone(),
            DocValue::Seq(_) | DocValue::Map(_) => String::new(),
        }
    }
}

/// Whether a general-purpose document parser is compiled in.
pub const fn has_general_parser() -> bool {
    cfg!(feature = "yaml")
}

/// Parse a document, preferring the general-purpose parser when available.
///
/// With the `yaml` feature this delegates to `serde_yaml`; otherwise it uses
/// the subset parser. Both produce structurally identical trees for
/// documents restricted to the supported subset.
pub fn parse_document(text: &str) -> Result<DocValue> {
    #[cfg(feature = "yaml")]
    {
        parse_yaml(text)
    }
    #[cfg(not(feature = "yaml"))]
    {
        Ok(parse_subset(text))
    }
}

/// Read and parse a document from disk.
pub fn load_document(path: &Path) -> Result<DocValue> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read spec document from {}", path.display()))?;
    parse_document(&text)
        .wrap_err_with(|| format!("Failed to parse spec document from {}", path.display()))
}

/// Parse with the general-purpose YAML parser.
#[cfg(feature = "yaml")]
pub fn parse_yaml(text: &str) -> Result<DocValue> {
    let value: serde_yaml::Value =
        serde_yaml::from_str(text).wrap_err("Failed to parse document as YAML")?;
    Ok(convert_yaml(value))
}

#[cfg(feature = "yaml")]
fn convert_yaml(value: serde_yaml::Value) -> DocValue {
    use serde_yaml::Value;
    match value {
        Value::Null => DocValue::Null,
        Value::Bool(b) => DocValue::Bool(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                DocValue::Int(i)
            } else if let Some(f) = n.as_f64() {
                DocValue::Float(f)
            } else {
                DocValue::Str(n.to_string())
            }
        }
        Value::String(s) => DocValue::Str(s),
        Value::Sequence(items) => DocValue::Seq(items.into_iter().map(convert_yaml).collect()),
        Value::Mapping(mapping) => {
            // serde_yaml mappings are insertion-ordered, so document order
            // survives the conversion.
            let mut entries = Vec::with_capacity(mapping.len());
            for (key, value) in mapping {
                let key = match key {
                    Value::String(s) => s,
                    other => convert_yaml(other).scalar_string(),
                };
                entries.push((key, convert_yaml(value)));
            }
            DocValue::Map(entries)
        }
        Value::Tagged(tagged) => convert_yaml(tagged.value),
    }
}

/// Parse a scalar token: quoted strings unwrap, `true`/`false` become
/// booleans, `null`/`~` become null, then integer and float literals, and
/// anything else stays a string.
pub fn parse_scalar(raw: &str) -> DocValue {
    let val = raw.trim();
    if val.is_empty() {
        return DocValue::Str(String::new());
    }
    if val.len() >= 2 {
        let quoted = (val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\''));
        if quoted {
            return DocValue::Str(val[1..val.len() - 1].to_string());
        }
    }
    match val.to_ascii_lowercase().as_str() {
        "true" => return DocValue::Bool(true),
        "false" => return DocValue::Bool(false),
        "null" | "~" => return DocValue::Null,
        _ => {}
    }
    if let Ok(n) = val.parse::<i64>() {
        return DocValue::Int(n);
    }
    if let Ok(x) = val.parse::<f64>() {
        return DocValue::Float(x);
    }
    DocValue::Str(val.to_string())
}

/// Single-forward-scan parser for the supported document subset.
///
/// Unrecognized lines are skipped silently (with a debug diagnostic): this
/// is a best-effort parser, not a validating one.
pub fn parse_subset(text: &str) -> DocValue {
    let mut parser = SubsetParser::default();
    for line in text.lines() {
        parser.feed_line(line);
    }
    parser.finish()
}

/// Parser state: the current top-level key, the open sequence under it, the
/// open mapping item inside that sequence, and an open scalar sub-sequence
/// bound to a key of that item. The grammar is intentionally two levels
/// deep, so this is all the state a forward scan needs.
#[derive(Default)]
struct SubsetParser {
    root: Vec<(String, DocValue)>,
    current_key: Option<String>,
    current_list: Option<Vec<DocValue>>,
    current_item: Option<Vec<(String, DocValue)>>,
    current_sub_key: Option<String>,
    current_sub_list: Option<Vec<DocValue>>,
}

impl SubsetParser {
    fn feed_line(&mut self, raw_line: &str) {
        let line = raw_line.trim_end();
        let stripped = line.trim_start();
        if stripped.is_empty() || stripped.starts_with('#') {
            return;
        }

        let indent = line.len() - stripped.len();

        // Top-level key (column 0)
        if indent == 0 && stripped.contains(':') && !stripped.starts_with('-') {
            self.flush_item();
            if let (Some(list), Some(key)) = (self.current_list.take(), self.current_key.take()) {
                map_insert(&mut self.root, key, DocValue::Seq(list));
            }
            let (key, val) = split_key_value(stripped);
            if val.is_empty() {
                self.current_key = Some(key.to_string());
            } else {
                map_insert(&mut self.root, key.to_string(), parse_scalar(val));
                self.current_key = None;
            }
            return;
        }

        // Nested key inside a mapping (a list-item field or a metadata field)
        if indent >= 2 && stripped.contains(':') && !stripped.starts_with('-') {
            let (key, val) = split_key_value(stripped);
            if let Some(item) = self.current_item.as_mut() {
                if let (Some(sub_key), Some(sub_list)) =
                    (self.current_sub_key.take(), self.current_sub_list.take())
                {
                    map_insert(item, sub_key, DocValue::Seq(sub_list));
                }
                if val.is_empty() {
                    // Start of a sub-sequence
                    self.current_sub_key = Some(key.to_string());
                    self.current_sub_list = Some(Vec::new());
                } else {
                    map_insert(item, key.to_string(), parse_scalar(val));
                }
            } else if let Some(top_key) = self.current_key.as_ref() {
                // Field inside a top-level mapping block (like metadata)
                if self.root.iter().all(|(k, _)| k != top_key) {
                    self.root.push((top_key.clone(), DocValue::Map(Vec::new())));
                }
                if let Some((_, DocValue::Map(entries))) =
                    self.root.iter_mut().find(|(k, _)| k == top_key)
                {
                    map_insert(entries, key.to_string(), parse_scalar(val));
                }
            } else {
                debug!(line = %stripped, "skipping unrecognized document line");
            }
            return;
        }

        // Sequence item (`- key: value` or `- scalar`)
        if let Some(item_content) = stripped.strip_prefix("- ") {
            let item_content = item_content.trim();

            if item_content.contains(':') && self.current_key.is_some() {
                // Start of a new mapping item in the open sequence
                if self.current_list.is_none() {
                    self.current_list = Some(Vec::new());
                }
                self.flush_item();
                let mut item = Vec::new();
                let (key, val) = split_key_value(item_content);
                if val.is_empty() {
                    self.current_sub_key = Some(key.to_string());
                    self.current_sub_list = Some(Vec::new());
                } else {
                    map_insert(&mut item, key.to_string(), parse_scalar(val));
                }
                self.current_item = Some(item);
            } else if let Some(sub_list) = self.current_sub_list.as_mut() {
                sub_list.push(parse_scalar(item_content));
            } else if let Some(list) = self.current_list.as_mut() {
                list.push(parse_scalar(item_content));
            } else if self.current_key.is_some() {
                // First scalar of a top-level scalar sequence
                self.current_list = Some(vec![parse_scalar(item_content)]);
            } else {
                debug!(line = %stripped, "skipping unrecognized document line");
            }
            return;
        }

        debug!(line = %stripped, "skipping unrecognized document line");
    }

    /// Flush the pending item (and its open sub-sequence) into the open
    /// sequence.
    fn flush_item(&mut self) {
        if let Some(mut item) = self.current_item.take() {
            if let (Some(sub_key), Some(sub_list)) =
                (self.current_sub_key.take(), self.current_sub_list.take())
            {
                map_insert(&mut item, sub_key, DocValue::Seq(sub_list));
            }
            if let Some(list) = self.current_list.as_mut() {
                list.push(DocValue::Map(item));
            }
        }
        self.current_sub_key = None;
        self.current_sub_list = None;
    }

    fn finish(mut self) -> DocValue {
        self.flush_item();
        if let (Some(list), Some(key)) = (self.current_list.take(), self.current_key.take()) {
            map_insert(&mut self.root, key, DocValue::Seq(list));
        }
        DocValue::Map(self.root)
    }
}

fn split_key_value(line: &str) -> (&str, &str) {
    match line.split_once(':') {
        Some((key, val)) => (key.trim(), val.trim()),
        None => (line.trim(), ""),
    }
}

/// Insert into an ordered mapping, replacing in place if the key exists.
fn map_insert(entries: &mut Vec<(String, DocValue)>, key: String, value: DocValue) {
    if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == key) {
        slot.1 = value;
    } else {
        entries.push((key, value));
    }
}

/// Serialize a document tree back to text in the supported subset.
///
/// Parsing the output yields a structurally identical tree, with key order
/// and sequence order preserved exactly.
pub fn serialize_document(doc: &DocValue) -> String {
    let mut out = String::new();
    let DocValue::Map(entries) = doc else {
        return out;
    };
    for (key, value) in entries {
        match value {
            DocValue::Seq(items) => {
                out.push_str(key);
                out.push_str(":\n");
                for item in items {
                    match item {
                        DocValue::Map(fields) => serialize_item(fields, &mut out),
                        scalar => {
                            out.push_str("  - ");
                            out.push_str(&scalar_literal(scalar));
                            out.push('\n');
                        }
                    }
                }
            }
            DocValue::Map(fields) => {
                out.push_str(key);
                out.push_str(":\n");
                for (k, v) in fields {
                    out.push_str("  ");
                    out.push_str(k);
                    out.push_str(": ");
                    out.push_str(&scalar_literal(v));
                    out.push('\n');
                }
            }
            scalar => {
                out.push_str(key);
                out.push_str(": ");
                out.push_str(&scalar_literal(scalar));
                out.push('\n');
            }
        }
    }
    out
}

fn serialize_item(fields: &[(String, DocValue)], out: &mut String) {
    let mut first = true;
    for (key, value) in fields {
        let lead = if first { "  - " } else { "    " };
        first = false;
        match value {
            DocValue::Seq(items) => {
                out.push_str(lead);
                out.push_str(key);
                out.push_str(":\n");
                for item in items {
                    out.push_str("      - ");
                    out.push_str(&scalar_literal(item));
                    out.push('\n');
                }
            }
            scalar => {
                out.push_str(lead);
                out.push_str(key);
                out.push_str(": ");
                out.push_str(&scalar_literal(scalar));
                out.push('\n');
            }
        }
    }
}

fn scalar_literal(value: &DocValue) -> String {
    match value {
        DocValue::Null => "null".to_string(),
        DocValue::Bool(b) => b.to_string(),
        DocValue::Int(n) => n.to_string(),
        DocValue::Float(x) => float_literal(*x),
        DocValue::Str(s) => {
            if needs_quoting(s) {
                if s.contains('"') {
                    format!("'{}'", s)
                } else {
                    format!("\"{}\"", s)
                }
            } else {
                s.clone()
            }
        }
        // Containers never appear at scalar positions within the subset
        DocValue::Seq(_) | DocValue::Map(_) => String::new(),
    }
}

/// A string must be quoted if re-parsing it bare would yield anything other
/// than the same string.
fn needs_quoting(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    if s.contains(':') || s.contains('#') || s.starts_with('-') {
        return true;
    }
    if s.starts_with('"') || s.starts_with('\'') {
        return true;
    }
    if s != s.trim() {
        return true;
    }
    !matches!(parse_scalar(s), DocValue::Str(_))
}

fn float_literal(x: f64) -> String {
    if x.fract() == 0.0 && x.is_finite() {
        format!("{:.1}", x)
    } else {
        format!("{}", x)
    }
}
