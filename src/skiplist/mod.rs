//! Suite-wide exclusion rules
//!
//! A [`SkipList`] maps each [`SkipCategory`] to a list of entries. Path
//! entries exclude a file or a whole directory of tests; feature entries
//! exclude every test that declares that feature. The list is loaded from a
//! JSON file:
//!
//! ```text
//! {
//!   "skip_list": ["test/built-ins/Date/parse", { "paths": ["..."], "comment": "slow" }],
//!   "unsupported_features": ["Temporal", "ShadowRealm"],
//!   "handlesan_skip_list": ["test/built-ins/Array/length"]
//! }
//! ```

use crate::error::{Error, Result};
use crate::result::{TestCaseResult, TestResultCode};
use rustc_hash::FxHashMap as HashMap;
use serde::Deserialize;
use std::fmt;
use std::path::{Component, Path};

/// Named exclusion list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipCategory {
    /// Paths that currently fail and are skipped
    SkipList,
    /// Paths that will never be supported
    PermanentSkipList,
    /// Features not implemented yet
    UnsupportedFeatures,
    /// Features that will never be supported
    PermanentUnsupportedFeatures,
    /// Paths that run with the handle sanitizer disabled
    HandlesanSkipList,
    /// Intl tests, skipped unless the toolchain is built with Intl
    IntlTests,
}

impl SkipCategory {
    pub fn is_permanent(self) -> bool {
        matches!(
            self,
            SkipCategory::PermanentSkipList | SkipCategory::PermanentUnsupportedFeatures
        )
    }

    /// Whether entries in this category are feature names rather than paths
    pub fn is_feature_list(self) -> bool {
        matches!(
            self,
            SkipCategory::UnsupportedFeatures | SkipCategory::PermanentUnsupportedFeatures
        )
    }
}

impl fmt::Display for SkipCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SkipCategory::SkipList => "skip list",
            SkipCategory::PermanentSkipList => "permanent skip list",
            SkipCategory::UnsupportedFeatures => "unsupported features",
            SkipCategory::PermanentUnsupportedFeatures => "permanently unsupported features",
            SkipCategory::HandlesanSkipList => "handle sanitizer skip list",
            SkipCategory::IntlTests => "Intl tests",
        };
        f.write_str(name)
    }
}

/// Features the default toolchain does not implement
const DEFAULT_UNSUPPORTED_FEATURES: &[&str] = &[
    "Atomics",
    "SharedArrayBuffer",
    "FinalizationRegistry",
    "WeakRef",
    "Temporal",
    "ShadowRealm",
    "decorators",
    "import-assertions",
    "import-attributes",
    "json-modules",
    "resizable-arraybuffer",
    "tail-call-optimization",
    "top-level-await",
    "dynamic-import",
    "import.meta",
];

const DEFAULT_INTL_PATHS: &[&str] = &["test/intl402"];

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Single(String),
    Group {
        paths: Vec<String>,
        #[serde(default)]
        #[allow(dead_code)]
        comment: Option<String>,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawSkipList {
    skip_list: Vec<RawEntry>,
    permanent_skip_list: Vec<RawEntry>,
    unsupported_features: Vec<RawEntry>,
    permanent_unsupported_features: Vec<RawEntry>,
    handlesan_skip_list: Vec<RawEntry>,
    intl_tests: Vec<RawEntry>,
}

fn flatten(entries: Vec<RawEntry>) -> Vec<String> {
    entries
        .into_iter()
        .flat_map(|entry| match entry {
            RawEntry::Single(s) => vec![s],
            RawEntry::Group { paths, .. } => paths,
        })
        .collect()
}

/// Exclusion lookup consulted before and while running tests
#[derive(Debug, Clone, Default)]
pub struct SkipList {
    entries: HashMap<SkipCategory, Vec<String>>,
}

impl SkipList {
    /// An empty skip list (nothing is excluded)
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip list used when no file is given
    pub fn builtin() -> Self {
        let mut list = Self::new();
        for feature in DEFAULT_UNSUPPORTED_FEATURES {
            list.add(SkipCategory::UnsupportedFeatures, *feature);
        }
        for path in DEFAULT_INTL_PATHS {
            list.add(SkipCategory::IntlTests, *path);
        }
        list
    }

    /// Parse a skip list from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawSkipList = serde_json::from_str(json)?;
        let mut list = Self::new();
        let categories = [
            (SkipCategory::SkipList, raw.skip_list),
            (SkipCategory::PermanentSkipList, raw.permanent_skip_list),
            (SkipCategory::UnsupportedFeatures, raw.unsupported_features),
            (
                SkipCategory::PermanentUnsupportedFeatures,
                raw.permanent_unsupported_features,
            ),
            (SkipCategory::HandlesanSkipList, raw.handlesan_skip_list),
            (SkipCategory::IntlTests, raw.intl_tests),
        ];
        for (category, entries) in categories {
            for entry in flatten(entries) {
                list.add(category, entry);
            }
        }
        Ok(list)
    }

    /// Load a skip list file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| Error::SkipList {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json(&json).map_err(|e| Error::SkipList {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn add(&mut self, category: SkipCategory, entry: impl Into<String>) {
        self.entries.entry(category).or_default().push(entry.into());
    }

    /// Number of entries in a category
    pub fn len(&self, category: SkipCategory) -> usize {
        self.entries.get(&category).map_or(0, Vec::len)
    }

    /// Find the entry in `category` that matches `identifier`
    fn matching_entry(&self, identifier: &str, category: SkipCategory) -> Option<&str> {
        let entries = self.entries.get(&category)?;
        if category.is_feature_list() {
            entries
                .iter()
                .find(|entry| entry.as_str() == identifier)
                .map(String::as_str)
        } else {
            entries
                .iter()
                .find(|entry| path_contains(identifier, entry))
                .map(String::as_str)
        }
    }

    /// Whether `identifier` is listed in `category`
    pub fn should_skip_cat(&self, identifier: impl AsRef<str>, category: SkipCategory) -> bool {
        self.matching_entry(identifier.as_ref(), category).is_some()
    }

    /// Check `identifier` against `categories` in order and produce a terminal
    /// skip result for the first match.
    pub fn try_skip(
        &self,
        identifier: impl AsRef<str>,
        categories: &[SkipCategory],
        display_name: &str,
    ) -> Option<TestCaseResult> {
        let identifier = identifier.as_ref();
        categories.iter().find_map(|&category| {
            self.matching_entry(identifier, category).map(|entry| {
                let code = if category.is_permanent() {
                    TestResultCode::TestPermanentlySkipped
                } else {
                    TestResultCode::TestSkipped
                };
                let message = if category.is_feature_list() {
                    format!("SKIP: feature {} is in the {}", entry, category)
                } else {
                    format!("SKIP: {} matches '{}' in the {}", display_name, entry, category)
                };
                TestCaseResult::new(display_name, code, message)
            })
        })
    }
}

fn normal_components(path: &str) -> Vec<&str> {
    Path::new(path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect()
}

/// True if `entry`'s components occur as a contiguous run within `path`'s
/// components.
fn path_contains(path: &str, entry: &str) -> bool {
    let haystack = normal_components(path);
    let needle = normal_components(entry);
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle.as_slice())
}
