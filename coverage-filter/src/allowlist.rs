// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::Result;
use regex::Regex;

/// The three wildcard allowlists that compose a module/source-file/line
/// selection policy: modules by path, source files by path, and (reserved
/// for future symbol-level filtering) functions by demangled name.
#[derive(Clone, Debug, Default)]
pub struct TargetAllowList {
    pub functions: AllowList,
    pub modules: AllowList,
    pub source_files: AllowList,
}

impl TargetAllowList {
    pub fn new(modules: AllowList, source_files: AllowList) -> Self {
        // Allow all.
        let functions = AllowList::default();

        Self {
            functions,
            modules,
            source_files,
        }
    }
}

/// A set of `allow`/`deny` glob rules.
///
/// `AllowList::default()` (no rules at all) allows everything: it represents
/// "no filter configured". `AllowList::parse` of a rule file that contains no
/// usable rules denies everything instead, since an explicitly-provided empty
/// filter is read as "select nothing".
#[derive(Clone, Debug, Default)]
pub struct AllowList {
    allow: Vec<Regex>,
    deny: Vec<Regex>,
}

impl AllowList {
    pub fn is_allowed(&self, path: impl AsRef<str>) -> bool {
        let path = path.as_ref();

        match (self.allow.is_empty(), self.deny.is_empty()) {
            (false, false) => {
                // Allow only if rule-allowed but not also rule-denied.
                self.has_allow_match(path) && !self.has_deny_match(path)
            }
            (false, true) => {
                // Deny unless rule-allowed.
                self.has_allow_match(path)
            }
            (true, false) => {
                // Allow unless rule-denied.
                !self.has_deny_match(path)
            }
            (true, true) => {
                // Allow all.
                true
            }
        }
    }

    fn has_allow_match(&self, path: &str) -> bool {
        self.allow.iter().any(|re| re.is_match(path))
    }

    fn has_deny_match(&self, path: &str) -> bool {
        self.deny.iter().any(|re| re.is_match(path))
    }

    /// Parse a rule file already read into memory.
    ///
    /// A file with no allow or deny rules (blank, or only comments) denies
    /// everything, distinguishing "explicitly configured to select nothing"
    /// from `AllowList::default()`'s "no filter configured".
    pub fn parse(text: &str) -> Result<Self> {
        let mut allowlist = AllowList::default();

        // We could just collect and pass to the `RegexSet` ctor.
        //
        // Instead, check each rule individually for diagnostic purposes.
        for (index, line) in text.lines().enumerate() {
            match AllowListLine::parse(line) {
                Ok(valid) => {
                    use AllowListLine::*;

                    match valid {
                        Blank | Comment => {
                            // Ignore.
                        }
                        Allow(re) => {
                            allowlist.allow.push(re);
                        }
                        Deny(re) => {
                            allowlist.deny.push(re);
                        }
                    }
                }
                Err(err) => {
                    // Ignore invalid lines, but warn.
                    let line_number = index + 1;
                    warn!("error at line {}: {}", line_number, err);
                }
            }
        }

        if allowlist.allow.is_empty() && allowlist.deny.is_empty() {
            allowlist.deny.push(Regex::new(".*")?);
        }

        Ok(allowlist)
    }

    pub fn load(path: &str) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }
}

pub enum AllowListLine {
    Blank,
    Comment,
    Allow(Regex),
    Deny(Regex),
}

impl AllowListLine {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();

        // Allow and ignore blank lines.
        if line.is_empty() {
            return Ok(Self::Blank);
        }

        // Support comments of the form `# <comment>`.
        if line.starts_with("# ") {
            return Ok(Self::Comment);
        }

        // Deny rules are of the form `! <rule>`.
        if let Some(expr) = line.strip_prefix("! ") {
            let re = glob_to_regex(expr)?;
            return Ok(Self::Deny(re));
        }

        // Try to interpret as allow rule.
        let re = glob_to_regex(line)?;
        Ok(Self::Allow(re))
    }
}

/// Translate a glob rule (`*` as wildcard, everything else literal) into an
/// anchored regex matching the whole path.
fn glob_to_regex(expr: &str) -> Result<Regex> {
    let escaped = regex::escape(expr);
    let expr = escaped.replace(r"\*", ".*");
    let expr = format!("^{expr}$");

    Ok(Regex::new(&expr)?)
}

#[cfg(test)]
#[path = "allowlist/tests.rs"]
mod tests;
