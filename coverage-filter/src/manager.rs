// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The Coverage Filter Manager: composes a wildcard allowlist with zero or
//! more unified-diff filters into the three selection predicates consulted
//! while recording coverage.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::allowlist::{AllowList, TargetAllowList};
use crate::diff::{resolve_nearest_executable_line, UnifiedDiffFilter};

/// Wildcard module/source-file inclusion-exclusion configuration, kept
/// serializable so an orchestrator can persist and restore it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CoverageSettings {
    pub module_allow: Vec<String>,
    pub module_deny: Vec<String>,
    pub source_allow: Vec<String>,
    pub source_deny: Vec<String>,
}

impl CoverageSettings {
    fn build_allow_list(allow: &[String], deny: &[String]) -> anyhow::Result<AllowList> {
        let mut text = String::new();
        for rule in allow {
            text.push_str(rule);
            text.push('\n');
        }
        for rule in deny {
            text.push_str("! ");
            text.push_str(rule);
            text.push('\n');
        }
        if text.is_empty() {
            // No rules at all configured means "no restriction"; go through
            // `AllowList::default()` rather than `parse("")`, which denies
            // everything.
            return Ok(AllowList::default());
        }
        AllowList::parse(&text)
    }

    fn build(&self) -> anyhow::Result<TargetAllowList> {
        let modules = Self::build_allow_list(&self.module_allow, &self.module_deny)?;
        let source_files = Self::build_allow_list(&self.source_allow, &self.source_deny)?;
        Ok(TargetAllowList::new(modules, source_files))
    }
}

/// Composes a wildcard filter with an ordered set of unified-diff filters
/// into the module/source-file/line selection predicates.
pub struct CoverageFilter {
    wildcard: TargetAllowList,
    diffs: Vec<UnifiedDiffFilter>,
}

impl CoverageFilter {
    pub fn new(settings: &CoverageSettings, diffs: Vec<UnifiedDiffFilter>) -> anyhow::Result<Self> {
        Ok(Self {
            wildcard: settings.build()?,
            diffs,
        })
    }

    /// Consults only the wildcard filter: diff filters are file-granular and
    /// never restrict modules.
    pub fn is_module_selected(&self, module_filename: impl AsRef<str>) -> bool {
        self.wildcard.modules.is_allowed(module_filename)
    }

    /// `ANY_OR_TRUE_IF_EMPTY`: short-circuits false on a wildcard rejection;
    /// otherwise true if there are no diff filters, else true iff any diff
    /// filter accepts the file. Mutates the diff filters' own matched-path
    /// bookkeeping.
    pub fn is_source_file_selected(&self, source_filename: &Path) -> bool {
        let path_str = source_filename.to_string_lossy();
        if !self.wildcard.source_files.is_allowed(path_str.as_ref()) {
            return false;
        }
        if self.diffs.is_empty() {
            return true;
        }
        self.diffs
            .iter()
            .any(|diff| diff.is_source_file_selected(source_filename))
    }

    /// Resolves `line_number` to its nearest executable predecessor (per
    /// `executable_lines`) before applying the `ANY_OR_TRUE_IF_EMPTY` rule
    /// across diff filters. Returns true unconditionally when no diff filters
    /// are configured - wildcard filtering alone governs line selection.
    pub fn is_line_selected(
        &self,
        source_filename: &Path,
        line_number: u32,
        executable_lines: &BTreeSet<u32>,
    ) -> bool {
        if self.diffs.is_empty() {
            return true;
        }

        let Some(resolved_line) = resolve_nearest_executable_line(executable_lines, line_number)
        else {
            return false;
        };

        self.diffs
            .iter()
            .any(|diff| diff.is_line_selected(source_filename, resolved_line))
    }

    /// Collects the unmatched diff paths across every owned diff filter and
    /// formats the fixed warning message, truncated to `max_unmatched_paths`.
    /// Returns an empty vector when there is nothing to report.
    pub fn unmatched_warning_lines(&self, max_unmatched_paths: usize) -> Vec<String> {
        let mut unmatched: BTreeSet<String> = BTreeSet::new();
        for diff in &self.diffs {
            for path in diff.unmatched_paths() {
                unmatched.insert(path.to_string_lossy().into_owned());
            }
        }

        if unmatched.is_empty() {
            return Vec::new();
        }

        let total = unmatched.len();
        let mut lines = vec![
            "----------------------------------------".to_string(),
            format!(
                "You have {} path(s) inside unified diff file(s) that were ignored",
                total
            ),
            "because they did not match any path from pdb files.".to_string(),
            "To see all files use --verbose".to_string(),
        ];

        for path in unmatched.iter().take(max_unmatched_paths) {
            lines.push(format!("\t- {}", path));
        }
        if total > max_unmatched_paths {
            lines.push("\t...".to_string());
        }

        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffLines;
    use std::path::PathBuf;

    fn diff_filter(path: &str, lines: &[u32]) -> UnifiedDiffFilter {
        let mut diff_lines = DiffLines::new();
        diff_lines.insert(PathBuf::from(path), lines.iter().copied().collect());
        UnifiedDiffFilter::new("/", diff_lines)
    }

    #[test]
    fn test_empty_diff_configuration_selects_everything() {
        let settings = CoverageSettings::default();
        let filter = CoverageFilter::new(&settings, Vec::new()).unwrap();

        assert!(filter.is_module_selected("a.dll"));
        assert!(filter.is_source_file_selected(Path::new("/src/x.cpp")));
        assert!(filter.is_line_selected(Path::new("/src/x.cpp"), 42, &BTreeSet::new()));
    }

    #[test]
    fn test_nearest_executable_line_resolution() {
        let settings = CoverageSettings::default();
        let diffs = vec![diff_filter("/src/x.cpp", &[20])];
        let filter = CoverageFilter::new(&settings, diffs).unwrap();
        let executable: BTreeSet<u32> = [10, 20, 30].into_iter().collect();

        assert!(filter.is_line_selected(Path::new("/src/x.cpp"), 20, &executable));
        assert!(filter.is_line_selected(Path::new("/src/x.cpp"), 25, &executable));
        assert!(!filter.is_line_selected(Path::new("/src/x.cpp"), 9, &executable));
        assert!(!filter.is_line_selected(Path::new("/src/x.cpp"), 10, &executable));
    }

    #[test]
    fn test_union_across_diff_filters() {
        let settings = CoverageSettings::default();
        let diffs = vec![diff_filter("/src/x.cpp", &[10]), diff_filter("/src/x.cpp", &[20])];
        let filter = CoverageFilter::new(&settings, diffs).unwrap();
        let executable: BTreeSet<u32> = [10, 20].into_iter().collect();

        assert!(filter.is_line_selected(Path::new("/src/x.cpp"), 10, &executable));
        assert!(filter.is_line_selected(Path::new("/src/x.cpp"), 20, &executable));
        assert!(!filter.is_line_selected(Path::new("/src/x.cpp"), 30, &executable));
    }

    #[test]
    fn test_wildcard_rejection_short_circuits_diff_filters() {
        let settings = CoverageSettings {
            source_deny: vec!["*.cpp".to_string()],
            ..Default::default()
        };
        let diffs = vec![diff_filter("/src/x.cpp", &[10])];
        let filter = CoverageFilter::new(&settings, diffs).unwrap();

        assert!(!filter.is_source_file_selected(Path::new("/src/x.cpp")));
    }

    #[test]
    fn test_unmatched_warning_lines_format_and_truncation() {
        let settings = CoverageSettings::default();
        let diffs = vec![diff_filter("/src/a.cpp", &[1]), diff_filter("/src/b.cpp", &[1])];
        let filter = CoverageFilter::new(&settings, diffs).unwrap();

        // Never match any of the diff's paths against a source file, so both
        // stay unmatched.
        let lines = filter.unmatched_warning_lines(1);
        assert_eq!(lines[1], "You have 2 path(s) inside unified diff file(s) that were ignored");
        assert_eq!(lines.last().unwrap(), "\t...");
        assert_eq!(lines.iter().filter(|l| l.starts_with("\t- ")).count(), 1);
    }

    #[test]
    fn test_unmatched_warning_lines_empty_when_all_matched() {
        let settings = CoverageSettings::default();
        let diffs = vec![diff_filter("/src/a.cpp", &[1])];
        let filter = CoverageFilter::new(&settings, diffs).unwrap();

        assert!(filter.is_source_file_selected(Path::new("/src/a.cpp")));
        assert!(filter.unmatched_warning_lines(10).is_empty());
    }
}
