//! Ignore-file exclusion patterns.
//!
//! Patterns follow gitignore semantics as implemented by the `ignore` crate:
//! `#` starts a comment, `!` re-includes a previously excluded path, a
//! trailing `/` restricts a pattern to directories, and a pattern without a
//! slash matches at any depth.

use std::path::{Component, Path};
use std::sync::Arc;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::error::{PatternError, PatternResult};

/// An immutable, ordered set of exclusion patterns.
///
/// Cloning is cheap; the compiled matcher is shared.
#[derive(Debug, Clone)]
pub struct ExclusionPatterns {
    matcher: Arc<Gitignore>,
    patterns: Arc<[String]>,
}

impl ExclusionPatterns {
    /// A set that excludes nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            matcher: Arc::new(Gitignore::empty()),
            patterns: Arc::from(Vec::new()),
        }
    }

    /// Parse the text of an ignore file, one pattern per line.
    ///
    /// Blank lines and `#` comments are skipped. Surrounding whitespace is
    /// trimmed from each line.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::Syntax`] for the first line that is not a
    /// valid glob.
    pub fn from_ignore_file(content: &str) -> PatternResult<Self> {
        Self::from_lines(content.lines())
    }

    /// Build a set from individual patterns, in order.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::Syntax`] for the first invalid pattern.
    pub fn from_patterns<I, S>(patterns: I) -> PatternResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let owned: Vec<String> = patterns
            .into_iter()
            .map(|p| p.as_ref().to_owned())
            .collect();
        Self::from_lines(owned.iter().map(String::as_str))
    }

    fn from_lines<'a>(lines: impl Iterator<Item = &'a str>) -> PatternResult<Self> {
        let mut builder = GitignoreBuilder::new(".");
        let mut accepted = Vec::new();

        for (index, line) in lines.enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            builder
                .add_line(None, trimmed)
                .map_err(|e| PatternError::Syntax {
                    line: index.saturating_add(1),
                    pattern: trimmed.to_owned(),
                    message: e.to_string(),
                })?;
            accepted.push(trimmed.to_owned());
        }

        let matcher = builder
            .build()
            .map_err(|e| PatternError::Build(e.to_string()))?;

        Ok(Self {
            matcher: Arc::new(matcher),
            patterns: Arc::from(accepted),
        })
    }

    /// The accepted pattern lines, in file order.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Number of accepted patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether the set excludes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Report whether `path` (relative, slash-delimited) is excluded.
    ///
    /// A path is excluded if it or any parent directory matches, unless a
    /// later negated pattern re-includes it.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::Unmatchable`] for rooted paths and paths with
    /// `..` components, neither of which lies under the repository root the
    /// patterns are anchored at.
    pub fn matches(&self, path: &str, is_dir: bool) -> PatternResult<bool> {
        let trimmed = path.trim_end_matches('/');
        let candidate = Path::new(trimmed);
        let escapes_root = candidate.has_root()
            || trimmed.starts_with('/')
            || candidate
                .components()
                .any(|c| matches!(c, Component::ParentDir));
        if escapes_root {
            return Err(PatternError::Unmatchable {
                path: path.to_owned(),
            });
        }
        if self.is_empty() || trimmed.is_empty() {
            return Ok(false);
        }

        Ok(self
            .matcher
            .matched_path_or_any_parents(candidate, is_dir)
            .is_ignore())
    }
}

impl Default for ExclusionPatterns {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_matches_nothing() {
        let patterns = ExclusionPatterns::empty();
        assert!(patterns.is_empty());
        assert!(!patterns.matches("src/main.rs", false).unwrap());
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let patterns =
            ExclusionPatterns::from_ignore_file("# build output\n\n  target  \n*.log\n").unwrap();
        assert_eq!(patterns.patterns(), ["target", "*.log"]);
    }

    #[test]
    fn extension_glob_matches_at_any_depth() {
        let patterns = ExclusionPatterns::from_patterns(["*.log"]).unwrap();
        assert!(patterns.matches("debug.log", false).unwrap());
        assert!(patterns.matches("logs/nested/trace.log", false).unwrap());
        assert!(!patterns.matches("src/log.rs", false).unwrap());
    }

    #[test]
    fn directory_pattern_excludes_children() {
        let patterns = ExclusionPatterns::from_patterns(["node_modules"]).unwrap();
        assert!(patterns.matches("node_modules/", true).unwrap());
        assert!(patterns.matches("node_modules/left-pad/index.js", false).unwrap());
        assert!(!patterns.matches("src/node.js", false).unwrap());
    }

    #[test]
    fn negation_re_includes_a_later_match() {
        let patterns = ExclusionPatterns::from_ignore_file("*.md\n!README.md\n").unwrap();
        assert!(patterns.matches("CHANGELOG.md", false).unwrap());
        assert!(!patterns.matches("README.md", false).unwrap());
    }

    #[test]
    fn dir_only_pattern_ignores_files_of_same_name() {
        let patterns = ExclusionPatterns::from_patterns(["build/"]).unwrap();
        assert!(patterns.matches("build", true).unwrap());
        assert!(patterns.matches("build/out.o", false).unwrap());
        assert!(!patterns.matches("build", false).unwrap());
    }

    #[test]
    fn invalid_glob_reports_line() {
        let err = ExclusionPatterns::from_ignore_file("ok\n# c\nsrc/[a-\n").unwrap_err();
        match err {
            PatternError::Syntax { line, pattern, .. } => {
                assert_eq!(line, 3);
                assert_eq!(pattern, "src/[a-");
            },
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn parent_components_are_unmatchable() {
        let patterns = ExclusionPatterns::from_patterns(["*.log"]).unwrap();
        let err = patterns.matches("../outside.txt", false).unwrap_err();
        assert!(matches!(err, PatternError::Unmatchable { .. }));
        assert!(ExclusionPatterns::empty().matches("src/../../x", false).is_err());
    }

    #[test]
    fn rooted_path_is_unmatchable() {
        let patterns = ExclusionPatterns::from_patterns(["*.log"]).unwrap();
        let err = patterns.matches("/etc/app.log", false).unwrap_err();
        assert!(matches!(err, PatternError::Unmatchable { .. }));
    }
}
