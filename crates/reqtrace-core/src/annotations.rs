//! Annotation extractor: structured behavioral metadata from comments.
//!
//! Test functions are annotated with Gherkin-style block comments:
//!
//! ```c
//! /*
//!  * @feature State transitions
//!  * @req REQ-ST-001
//!  * @scenario Vehicle plug-in wakes the controller
//!  * @given the controller is idle
//!  * @when the pilot voltage drops to 9V
//!  * @then the state becomes CONNECTED
//!  */
//! void test_idle_to_connected(void)
//! ```
//!
//! Extraction runs in two explicit stages so the policies stay testable in
//! isolation: block discovery (which comments qualify, and for which
//! function) and tag tokenization (what the lines of a block mean).

use eyre::Result;
use serde::Serialize;
use std::path::Path;

use crate::scanner::list_test_files;

/// One annotated test: the parsed tags plus where they came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TestAnnotation {
    pub feature: String,
    /// Requirement identifier (`@req`).
    pub req: String,
    pub scenario: String,
    /// `@given` steps, in narrative order.
    pub given: Vec<String>,
    /// `@when` steps, in narrative order.
    pub when: Vec<String>,
    /// `@then` steps, in narrative order.
    pub then: Vec<String>,
    /// The test function the comment block is attached to.
    pub function_name: String,
    pub file_name: String,
    /// Line where the comment block begins (1-indexed).
    pub line_number: usize,
}

/// Extract all annotations from one file's content, in source order.
///
/// A block comment qualifies only if it is immediately followed by a test
/// function declaration and mentions `@feature` or `@scenario` before it
/// closes; anything else (license headers, prose) is ignored. A file with
/// no qualifying blocks yields an empty list, never an error.
pub fn extract_annotations(file_name: &str, content: &str) -> Vec<TestAnnotation> {
    let mut annotations = Vec::new();
    let mut search = 0;

    while let Some(open_offset) = content[search..].find("/*") {
        let open = search + open_offset;
        let body_start = open + 2;
        let Some(close_offset) = content[body_start..].find("*/") else {
            break;
        };
        let close = body_start + close_offset;
        search = close + 2;

        let body = &content[body_start..close];
        if !block_qualifies(body) {
            continue;
        }

        let Some(function_name) = attached_test_function(&content[close + 2..]) else {
            continue;
        };

        let line_number = content[..open].matches('\n').count() + 1;
        let mut annotation = parse_annotation_block(body);
        annotation.function_name = function_name.to_string();
        annotation.file_name = file_name.to_string();
        annotation.line_number = line_number;
        annotations.push(annotation);
    }

    annotations
}

/// Extract annotations from every `test_*.c` file directly under `dir`, in
/// lexicographic file order.
pub fn extract_from_dir(dir: &Path) -> Result<Vec<TestAnnotation>> {
    let mut annotations = Vec::new();
    for path in list_test_files(dir)? {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bytes = std::fs::read(&path)?;
        let content = String::from_utf8_lossy(&bytes);
        annotations.extend(extract_annotations(&file_name, &content));
    }
    Ok(annotations)
}

/// Stage 1a: does this comment body qualify as an annotation block?
///
/// The opening line must carry nothing but whitespace after `/*`, and the
/// body must mention a feature or scenario tag before the comment closes.
fn block_qualifies(body: &str) -> bool {
    let first_line_blank = match body.find('\n') {
        Some(newline) => body[..newline].trim().is_empty(),
        // Single-line blocks are never annotation blocks
        None => return false,
    };
    first_line_blank && (body.contains("@feature") || body.contains("@scenario"))
}

/// Stage 1b: the test function declaration directly following the block.
///
/// Requires a line break between `*/` and the declaration, then
/// `void test_<identifier>(`.
fn attached_test_function(after_close: &str) -> Option<&str> {
    let decl = after_close.trim_start();
    let gap = &after_close[..after_close.len() - decl.len()];
    if !gap.contains('\n') {
        return None;
    }

    let rest = decl.strip_prefix("void")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();
    if !rest.starts_with("test_") {
        return None;
    }
    let name_len = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .map(char::len_utf8)
        .sum::<usize>();
    if name_len <= "test_".len() {
        return None;
    }
    rest[name_len..]
        .trim_start()
        .starts_with('(')
        .then(|| &rest[..name_len])
}

/// Stage 2: tokenize a qualifying block's lines by tag.
///
/// `given`/`when`/`then` accumulate in order; `feature`/`req`/`scenario`
/// overwrite, last occurrence wins; unknown tags are ignored.
pub fn parse_annotation_block(body: &str) -> TestAnnotation {
    let mut annotation = TestAnnotation::default();

    for raw_line in body.lines() {
        // Strip comment decoration: surrounding whitespace and leading '*'
        let line = raw_line.trim().trim_start_matches(['*', ' ']).trim();
        if line.is_empty() {
            continue;
        }
        let Some((tag, value)) = split_tag_line(line) else {
            continue;
        };
        match tag.to_ascii_lowercase().as_str() {
            "given" => annotation.given.push(value.to_string()),
            "when" => annotation.when.push(value.to_string()),
            "then" => annotation.then.push(value.to_string()),
            "feature" => annotation.feature = value.to_string(),
            "req" => annotation.req = value.to_string(),
            "scenario" => annotation.scenario = value.to_string(),
            _ => {}
        }
    }

    annotation
}

/// Split `@tag value` into its tag word and trimmed value. The tag must be
/// followed by whitespace; a bare `@tag` carries no value and is skipped.
fn split_tag_line(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix('@')?;
    let tag_len = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .map(char::len_utf8)
        .sum::<usize>();
    if tag_len == 0 {
        return None;
    }
    let after = &rest[tag_len..];
    if !after.starts_with(char::is_whitespace) {
        return None;
    }
    Some((&rest[..tag_len], after.trim()))
}
