// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A single unified-diff-scoped filter: per source file, the set of line
//! numbers a diff hunk touches.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Per-file line sets produced by a unified-diff parser (out of scope here;
/// only the resulting map is consumed).
pub type DiffLines = BTreeMap<PathBuf, BTreeSet<u32>>;

/// One parsed unified-diff's worth of selectable (path, line) pairs.
///
/// Tracks, as predicates are consulted, which of its own paths were ever
/// matched against a source file seen during filtering - the bookkeeping that
/// backs [`crate::manager::CoverageFilter::unmatched_warning_lines`].
pub struct UnifiedDiffFilter {
    root_folder: PathBuf,
    lines: DiffLines,
    matched: RefCell<BTreeSet<PathBuf>>,
}

impl UnifiedDiffFilter {
    pub fn new(root_folder: impl Into<PathBuf>, lines: DiffLines) -> Self {
        Self {
            root_folder: root_folder.into(),
            lines,
            matched: RefCell::new(BTreeSet::new()),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_relative() {
            self.root_folder.join(path)
        } else {
            path.to_path_buf()
        }
    }

    /// True if `path` is covered by this diff at all. Marks the path as
    /// matched, for later unmatched-path reporting.
    pub fn is_source_file_selected(&self, path: &Path) -> bool {
        let resolved = self.resolve(path);
        let selected = self.lines.contains_key(&resolved);
        if selected {
            self.matched.borrow_mut().insert(resolved);
        }
        selected
    }

    /// True if `line` is one of the diff's touched lines for `path`. Marks
    /// the path as matched, for later unmatched-path reporting.
    pub fn is_line_selected(&self, path: &Path, line: u32) -> bool {
        let resolved = self.resolve(path);
        let selected = self
            .lines
            .get(&resolved)
            .map(|lines| lines.contains(&line))
            .unwrap_or(false);
        if selected {
            self.matched.borrow_mut().insert(resolved);
        }
        selected
    }

    /// Paths named by the diff that were never matched against any source
    /// file seen during filtering.
    pub fn unmatched_paths(&self) -> BTreeSet<PathBuf> {
        let matched = self.matched.borrow();
        self.lines
            .keys()
            .filter(|path| !matched.contains(*path))
            .cloned()
            .collect()
    }
}

/// Resolve `line` to the nearest executable line at or below it within
/// `executable_lines`, per the manager's nearest-executable-line rule.
///
/// Mirrors a `lower_bound` lookup: find the smallest element `>= line`. If it
/// equals `line`, use it. Otherwise, fall back to the largest element
/// strictly less than `line` - but only when `line` falls strictly between
/// two executable lines. A `line` past every known executable line, or below
/// all of them, has no mappable predecessor and resolves to `None`.
pub fn resolve_nearest_executable_line(
    executable_lines: &BTreeSet<u32>,
    line: u32,
) -> Option<u32> {
    match executable_lines.range(line..).next() {
        Some(&at_or_after) if at_or_after == line => Some(line),
        Some(_) => executable_lines.range(..line).next_back().copied(),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_nearest_executable_line() {
        let executable: BTreeSet<u32> = [10, 20, 30].into_iter().collect();

        assert_eq!(resolve_nearest_executable_line(&executable, 20), Some(20));
        assert_eq!(resolve_nearest_executable_line(&executable, 25), Some(20));
        assert_eq!(resolve_nearest_executable_line(&executable, 9), None);
        assert_eq!(resolve_nearest_executable_line(&executable, 10), Some(10));
    }

    #[test]
    fn test_is_source_file_selected_and_unmatched() {
        let mut diff_lines = DiffLines::new();
        diff_lines.insert(PathBuf::from("/src/x.cpp"), [10, 20].into_iter().collect());
        diff_lines.insert(PathBuf::from("/src/unseen.cpp"), [1].into_iter().collect());

        let filter = UnifiedDiffFilter::new("/src", diff_lines);

        assert!(filter.is_source_file_selected(Path::new("/src/x.cpp")));
        assert!(!filter.is_source_file_selected(Path::new("/src/y.cpp")));
        assert!(filter.is_line_selected(Path::new("/src/x.cpp"), 10));
        assert!(!filter.is_line_selected(Path::new("/src/x.cpp"), 30));

        let unmatched = filter.unmatched_paths();
        assert_eq!(unmatched.len(), 1);
        assert!(unmatched.contains(&PathBuf::from("/src/unseen.cpp")));
    }

    #[test]
    fn test_relative_path_resolution() {
        let mut diff_lines = DiffLines::new();
        diff_lines.insert(PathBuf::from("/repo/src/x.cpp"), [5].into_iter().collect());

        let filter = UnifiedDiffFilter::new("/repo", diff_lines);
        assert!(filter.is_source_file_selected(Path::new("src/x.cpp")));
    }
}
