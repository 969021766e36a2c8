//! Test262 test loading
//!
//! Turns a test file into a [`TestCase`]: the metadata from its YAML
//! frontmatter (`/*--- ... ---*/`) plus the source that will actually be fed
//! to the compiler, with the harness files the test needs prepended.

use crate::error::{Error, Result};
use bitflags::bitflags;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

bitflags! {
    /// Which renderings of a test must be run
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StrictMode: u8 {
        /// With a `'use strict';` directive prepended
        const STRICT = 0b01;
        /// Verbatim
        const NO_STRICT = 0b10;
    }
}

/// Harness files every non-`raw` test depends on
const DEFAULT_INCLUDES: &[&str] = &["assert.js", "sta.js"];

/// Phase in which a negative test is expected to fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegativePhase {
    Parse,
    Early,
    Resolution,
    Runtime,
    Other(String),
}

impl NegativePhase {
    pub fn parse(phase: &str) -> Self {
        match phase {
            "parse" => NegativePhase::Parse,
            "early" => NegativePhase::Early,
            "resolution" => NegativePhase::Resolution,
            "runtime" => NegativePhase::Runtime,
            other => NegativePhase::Other(other.to_string()),
        }
    }

    /// Failure expected from the compiler rather than the runtime
    pub fn is_compile_time(&self) -> bool {
        matches!(self, NegativePhase::Parse | NegativePhase::Early)
    }
}

impl fmt::Display for NegativePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegativePhase::Parse => f.write_str("parse"),
            NegativePhase::Early => f.write_str("early"),
            NegativePhase::Resolution => f.write_str("resolution"),
            NegativePhase::Runtime => f.write_str("runtime"),
            NegativePhase::Other(s) => f.write_str(s),
        }
    }
}

/// Expected failure from `negative:` metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negative {
    pub phase: NegativePhase,
    /// Error constructor name (SyntaxError, TypeError, ...)
    pub error_type: String,
}

/// Metadata parsed from the frontmatter
#[derive(Debug, Clone, Default)]
pub struct TestMetadata {
    pub description: String,
    pub es_id: Option<String>,
    pub features: Vec<String>,
    pub flags: BTreeSet<String>,
    pub includes: Vec<String>,
    pub negative: Option<Negative>,
}

fn frontmatter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*---(.*?)---\*/").expect("frontmatter regex is valid"))
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches(|c| c == '\'' || c == '"')
}

fn inline_list(value: &str) -> Vec<String> {
    value
        .trim()
        .trim_matches(|c| c == '[' || c == ']')
        .split(',')
        .map(|s| unquote(s).to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl TestMetadata {
    /// Parse metadata from test file content
    pub fn parse(source: &str) -> Self {
        let mut metadata = Self::default();
        let Some(yaml) = frontmatter_regex()
            .captures(source)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
        else {
            return metadata;
        };

        let mut current_key = "";
        let mut negative_phase: Option<String> = None;
        let mut negative_type = String::new();

        for raw_line in yaml.lines() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            let indented = raw_line.starts_with(' ') || raw_line.starts_with('\t');
            if !indented {
                let Some((key, value)) = line.split_once(':') else {
                    continue;
                };
                current_key = key.trim();
                let value = value.trim();
                match current_key {
                    "description" if value != "|" && value != ">" => {
                        metadata.description = unquote(value).to_string();
                    }
                    "esid" => metadata.es_id = Some(value.to_string()),
                    "flags" => metadata.flags.extend(inline_list(value)),
                    "features" => metadata.features.extend(inline_list(value)),
                    "includes" => metadata.includes.extend(inline_list(value)),
                    "negative" => negative_phase = Some(String::new()),
                    _ => {}
                }
                continue;
            }

            if let Some(item) = line.strip_prefix('-') {
                let item = unquote(item).to_string();
                if item.is_empty() {
                    continue;
                }
                match current_key {
                    "flags" => {
                        metadata.flags.insert(item);
                    }
                    "features" => metadata.features.push(item),
                    "includes" => metadata.includes.push(item),
                    _ => {}
                }
            } else if current_key == "negative" {
                if let Some((key, value)) = line.split_once(':') {
                    match key.trim() {
                        "phase" => negative_phase = Some(value.trim().to_string()),
                        "type" => negative_type = value.trim().to_string(),
                        _ => {}
                    }
                }
            } else if current_key == "description" {
                if !metadata.description.is_empty() {
                    metadata.description.push(' ');
                }
                metadata.description.push_str(line);
            }
        }

        metadata.negative = negative_phase.map(|phase| Negative {
            phase: NegativePhase::parse(&phase),
            error_type: negative_type,
        });
        metadata
    }

    /// Renderings required by the test's flags
    pub fn strict_mode(&self) -> StrictMode {
        if self.flags.contains("onlyStrict") {
            StrictMode::STRICT
        } else if self.flags.contains("noStrict") || self.flags.contains("raw") {
            StrictMode::NO_STRICT
        } else {
            StrictMode::STRICT | StrictMode::NO_STRICT
        }
    }
}

/// A preprocessed test, ready to be written out and compiled
#[derive(Debug, Clone)]
pub struct TestCase {
    /// Harness files followed by the test body
    pub source: String,
    pub strict_mode: StrictMode,
    pub flags: BTreeSet<String>,
    pub features: Vec<String>,
    /// Harness files the test declared (defaults not included)
    pub includes: Vec<String>,
    pub negative: Option<Negative>,
}

impl TestCase {
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    /// File-name suffix encoding the test's flags, e.g. `.noStrict_raw`
    pub fn flags_suffix(&self) -> String {
        if self.flags.is_empty() {
            String::new()
        } else {
            let flags: Vec<&str> = self.flags.iter().map(String::as_str).collect();
            format!(".{}", flags.join("_"))
        }
    }
}

/// Build a [`TestCase`] from a test file's content.
///
/// `suite_path` is the suite root; harness includes are read from its
/// `harness/` directory. `test_name` is only used in error messages.
pub fn generate_source(content: &str, suite_path: &Path, test_name: &str) -> Result<TestCase> {
    let metadata = TestMetadata::parse(content);
    let strict_mode = metadata.strict_mode();

    let source = if metadata.flags.contains("raw") {
        content.to_string()
    } else {
        let harness_dir = suite_path.join("harness");
        let mut source = String::new();
        let mut seen = BTreeSet::new();
        let includes = DEFAULT_INCLUDES
            .iter()
            .copied()
            .chain(metadata.includes.iter().map(String::as_str));
        for include in includes {
            if !seen.insert(include) {
                continue;
            }
            let path = harness_dir.join(include);
            let text = std::fs::read_to_string(&path).map_err(|e| {
                Error::harness(test_name, format!("cannot read {}: {}", path.display(), e))
            })?;
            source.push_str(&text);
            source.push('\n');
        }
        source.push_str(content);
        source
    };

    Ok(TestCase {
        source,
        strict_mode,
        flags: metadata.flags,
        features: metadata.features,
        includes: metadata.includes,
        negative: metadata.negative,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_parse() {
        let source = r#"/*---
description: Testing basic addition
esid: sec-addition
features: [Symbol, Symbol.iterator]
flags: [noStrict]
---*/
assert.sameValue(1 + 1, 2);
"#;
        let meta = TestMetadata::parse(source);
        assert_eq!(meta.description, "Testing basic addition");
        assert_eq!(meta.es_id, Some("sec-addition".to_string()));
        assert_eq!(meta.features, vec!["Symbol", "Symbol.iterator"]);
        assert!(meta.flags.contains("noStrict"));
        assert_eq!(meta.strict_mode(), StrictMode::NO_STRICT);
    }

    #[test]
    fn test_metadata_negative() {
        let source = r#"/*---
description: Test that syntax error is thrown
negative:
  phase: parse
  type: SyntaxError
---*/
var 123abc = 1;
"#;
        let meta = TestMetadata::parse(source);
        let neg = meta.negative.unwrap();
        assert_eq!(neg.phase, NegativePhase::Parse);
        assert!(neg.phase.is_compile_time());
        assert_eq!(neg.error_type, "SyntaxError");
    }

    #[test]
    fn test_block_lists() {
        let source = r#"/*---
description: |
  A long description
  over two lines
includes:
  - compareArray.js
  - propertyHelper.js
features:
  - Temporal
flags:
  - onlyStrict
---*/
"#;
        let meta = TestMetadata::parse(source);
        assert_eq!(meta.description, "A long description over two lines");
        assert_eq!(meta.includes, vec!["compareArray.js", "propertyHelper.js"]);
        assert_eq!(meta.features, vec!["Temporal"]);
        assert_eq!(meta.strict_mode(), StrictMode::STRICT);
        assert!(meta.negative.is_none());
    }

    #[test]
    fn test_default_strict_mode_runs_both() {
        let meta = TestMetadata::parse("/*---\ndescription: x\n---*/");
        assert_eq!(meta.strict_mode(), StrictMode::all());
    }

    #[test]
    fn test_missing_frontmatter() {
        let meta = TestMetadata::parse("var x = 1;");
        assert!(meta.flags.is_empty());
        assert!(meta.features.is_empty());
    }

    #[test]
    fn test_generate_source_prepends_harness() {
        let dir = tempfile::tempdir().unwrap();
        let harness = dir.path().join("harness");
        std::fs::create_dir_all(&harness).unwrap();
        std::fs::write(harness.join("assert.js"), "// assert").unwrap();
        std::fs::write(harness.join("sta.js"), "// sta").unwrap();
        std::fs::write(harness.join("compareArray.js"), "// compareArray").unwrap();

        let content = "/*---\nincludes: [compareArray.js, assert.js]\n---*/\nbody();\n";
        let case = generate_source(content, dir.path(), "t.js").unwrap();
        let assert_pos = case.source.find("// assert").unwrap();
        let sta_pos = case.source.find("// sta").unwrap();
        let cmp_pos = case.source.find("// compareArray").unwrap();
        assert!(assert_pos < sta_pos && sta_pos < cmp_pos);
        assert_eq!(case.source.matches("// assert").count(), 1);
        assert!(case.source.ends_with("body();\n"));
    }

    #[test]
    fn test_generate_source_raw_is_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let content = "/*---\nflags: [raw]\n---*/\n'use strict'";
        let case = generate_source(content, dir.path(), "raw.js").unwrap();
        assert_eq!(case.source, content);
        assert_eq!(case.strict_mode, StrictMode::NO_STRICT);
        assert_eq!(case.flags_suffix(), ".raw");
    }

    #[test]
    fn test_generate_source_missing_include() {
        let dir = tempfile::tempdir().unwrap();
        let err = generate_source("x", dir.path(), "missing.js").unwrap_err();
        assert!(matches!(err, Error::Harness { .. }));
    }

    #[test]
    fn test_flags_suffix_is_sorted() {
        let mut flags = BTreeSet::new();
        flags.insert("noStrict".to_string());
        flags.insert("CanBlockIsFalse".to_string());
        let case = TestCase {
            source: String::new(),
            strict_mode: StrictMode::NO_STRICT,
            flags,
            features: vec![],
            includes: vec![],
            negative: None,
        };
        assert_eq!(case.flags_suffix(), ".CanBlockIsFalse_noStrict");
    }
}
