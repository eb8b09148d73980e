//! Test function scanner: ground-truth existence data for test functions.
//!
//! The scanner is deliberately independent of the annotation extractor; a
//! function counts as existing whether or not it carries an annotation
//! block.

use eyre::{Result, bail};
use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Index of known test functions: function name to the files defining it.
///
/// A name defined in multiple files keeps one entry per file, in scan
/// order; duplicates are preserved so reports can surface them.
#[derive(Debug, Clone, Default)]
pub struct FunctionIndex {
    functions: BTreeMap<String, Vec<String>>,
}

impl FunctionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan every `test_*.c` file directly under `dir`, in lexicographic
    /// order, and index all test function definitions found.
    pub fn scan_dir(dir: &Path) -> Result<Self> {
        let mut index = FunctionIndex::new();
        for path in list_test_files(dir)? {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            // Lenient read: firmware test sources occasionally carry
            // non-UTF-8 bytes in string literals
            let bytes = std::fs::read(&path)?;
            let content = String::from_utf8_lossy(&bytes);
            index.add_file_content(&file_name, &content);
        }
        Ok(index)
    }

    /// Index one file's content under the given file name.
    pub fn add_file_content(&mut self, file_name: &str, content: &str) {
        for line in content.lines() {
            if let Some(name) = test_definition_name(line) {
                self.functions
                    .entry(name.to_string())
                    .or_default()
                    .push(file_name.to_string());
            }
        }
    }

    pub fn contains(&self, function: &str) -> bool {
        self.functions.contains_key(function)
    }

    /// The files defining a function, in scan order.
    pub fn files_for(&self, function: &str) -> Option<&[String]> {
        self.functions.get(function).map(Vec::as_slice)
    }

    /// Number of unique function names indexed.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.functions
            .iter()
            .map(|(name, files)| (name.as_str(), files.as_slice()))
    }
}

/// List `test_*.c` files directly under `dir`, sorted by path for
/// deterministic scan order.
pub(crate) fn list_test_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Test directory not found: {}", dir.display());
    }

    let mut files: Vec<PathBuf> = WalkBuilder::new(dir)
        .max_depth(Some(1))
        .follow_links(true)
        .hidden(false)
        .build()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && is_test_source(path))
        .collect();
    files.sort();
    Ok(files)
}

fn is_test_source(path: &Path) -> bool {
    let named_like_test = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("test_"));
    named_like_test && path.extension().is_some_and(|ext| ext == "c")
}

/// Match a test function definition: `void test_<identifier>(void)`,
/// allowing arbitrary whitespace between tokens on the line.
fn test_definition_name(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix("void")?;
    // Whitespace is required after the return type
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
    let name = &rest[..name_len];

    let after = rest[name_len..].trim_start().strip_prefix('(')?;
    let after = after.trim_start().strip_prefix("void")?;
    after.trim_start().starts_with(')').then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_definition_matching() {
        assert_eq!(
            test_definition_name("void test_idle_to_connected(void)"),
            Some("test_idle_to_connected")
        );
        assert_eq!(
            test_definition_name("  void  test_x1 ( void )"),
            Some("test_x1")
        );
        assert_eq!(
            test_definition_name("void test_charging(void) {"),
            Some("test_charging")
        );

        // Not test functions
        assert_eq!(test_definition_name("void setup(void)"), None);
        assert_eq!(test_definition_name("void test_(void)"), None);
        assert_eq!(test_definition_name("int test_foo(void)"), None);
        assert_eq!(test_definition_name("void test_foo(int argc)"), None);
        assert_eq!(test_definition_name("voidtest_foo(void)"), None);
        // Calls are not definitions
        assert_eq!(test_definition_name("    run(test_foo);"), None);
    }

    #[test]
    fn test_index_from_content() {
        let mut index = FunctionIndex::new();
        index.add_file_content(
            "test_states.c",
            indoc! {"
                /* helpers */
                static void reset(void) {}

                void test_idle_to_connected(void) {
                }

                void test_connected_to_charging(void)
                {
                }
            "},
        );

        assert_eq!(index.len(), 2);
        assert!(index.contains("test_idle_to_connected"));
        assert!(index.contains("test_connected_to_charging"));
        assert!(!index.contains("reset"));
        assert_eq!(
            index.files_for("test_idle_to_connected").unwrap(),
            ["test_states.c"]
        );
    }

    #[test]
    fn test_duplicate_definitions_accumulate() {
        let mut index = FunctionIndex::new();
        index.add_file_content("test_a.c", "void test_shared(void) {}");
        index.add_file_content("test_b.c", "void test_shared(void) {}");

        assert_eq!(index.len(), 1);
        assert_eq!(
            index.files_for("test_shared").unwrap(),
            ["test_a.c", "test_b.c"]
        );
    }

    #[test]
    fn test_scan_dir_is_lexicographic() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("test_zeta.c"),
            "void test_shared(void) {}\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("test_alpha.c"),
            "void test_shared(void) {}\nvoid test_only_here(void) {}\n",
        )
        .unwrap();
        // Ignored: wrong extension, wrong prefix
        std::fs::write(dir.path().join("test_notes.txt"), "void test_nope(void)").unwrap();
        std::fs::write(dir.path().join("helpers.c"), "void test_nope(void) {}").unwrap();

        let index = FunctionIndex::scan_dir(dir.path()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.files_for("test_shared").unwrap(),
            ["test_alpha.c", "test_zeta.c"]
        );
        assert!(!index.contains("test_nope"));
    }

    #[test]
    fn test_scan_dir_missing_directory() {
        assert!(FunctionIndex::scan_dir(Path::new("/nonexistent/tests")).is_err());
    }
}
