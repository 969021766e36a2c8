//! Test file discovery

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Name fragment of helper files that are imported by tests, not run
const FIXTURE_MARKER: &str = "_FIXTURE";

fn is_test_file(path: &Path) -> bool {
    let is_js = path.extension().is_some_and(|e| e == "js");
    let is_fixture = path
        .file_name()
        .is_some_and(|n| n.to_string_lossy().contains(FIXTURE_MARKER));
    is_js && !is_fixture
}

fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk_dir(&path, files)?;
        } else if is_test_file(&path) {
            files.push(path);
        }
    }
    Ok(())
}

/// Every test file under `paths`, sorted and without duplicates.
///
/// Directories are searched recursively; a path naming a file is taken as is.
pub fn list_all_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            walk_dir(path, &mut files)?;
        } else if path.exists() {
            files.push(path.clone());
        } else {
            return Err(Error::TestPathNotFound(path.clone()));
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Longest common ancestor of `paths` (component-wise)
pub fn common_path(paths: &[PathBuf]) -> PathBuf {
    let mut iter = paths.iter();
    let Some(first) = iter.next() else {
        return PathBuf::new();
    };
    let mut common: Vec<_> = first.components().collect();
    for path in iter {
        let shared = common
            .iter()
            .zip(path.components())
            .take_while(|(a, b)| **a == *b)
            .count();
        common.truncate(shared);
    }
    common.iter().collect()
}

/// Nearest ancestor of `test_file` that contains a `harness/` directory
pub fn suite_root(test_file: &Path) -> Option<PathBuf> {
    test_file
        .ancestors()
        .skip(1)
        .find(|dir| dir.join("harness").is_dir())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_list_all_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("test/b/z.js"));
        touch(&root.join("test/b/a.js"));
        touch(&root.join("test/a/m.js"));
        touch(&root.join("test/a/helper_FIXTURE.js"));
        touch(&root.join("test/a/notes.txt"));

        let files = list_all_files(&[root.join("test"), root.join("test/b/a.js")]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["test/a/m.js", "test/b/a.js", "test/b/z.js"]);
    }

    #[test]
    fn test_list_all_files_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_all_files(&[dir.path().join("nope")]).unwrap_err();
        assert!(matches!(err, Error::TestPathNotFound(_)));
    }

    #[test]
    fn test_common_path() {
        let paths = vec![
            PathBuf::from("/suite/test/built-ins/Array"),
            PathBuf::from("/suite/test/built-ins/Object/keys"),
        ];
        assert_eq!(common_path(&paths), PathBuf::from("/suite/test/built-ins"));
        assert_eq!(
            common_path(&[PathBuf::from("/suite/test/a.js")]),
            PathBuf::from("/suite/test/a.js")
        );
        assert_eq!(common_path(&[]), PathBuf::new());
    }

    #[test]
    fn test_suite_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("harness")).unwrap();
        touch(&root.join("test/language/a.js"));
        assert_eq!(
            suite_root(&root.join("test/language/a.js")),
            Some(root.to_path_buf())
        );

        let other = tempfile::tempdir().unwrap();
        touch(&other.path().join("x.js"));
        assert_eq!(suite_root(&other.path().join("x.js")), None);
    }
}
