//! Content scanner
//!
//! Flags template content that calls functions from a configurable
//! deny-list. This is a best-effort guard against obvious mistakes and
//! careless automation, not a sandbox: obfuscated code passes it easily,
//! so it must never be the only line of defence.

use regex::Regex;

/// Markers that switch a template from plain text into executable code
pub const DEFAULT_SCRIPT_MARKERS: &[&str] = &["<?php", "<?="];

/// Function names rejected inside executable content
pub const DEFAULT_DANGEROUS_FUNCTIONS: &[&str] =
    &["eval", "exec", "system", "shell_exec", "passthru", "assert"];

/// `name` followed by an opening parenthesis, on a word boundary
fn compile_pattern(name: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"(?i)\b{}\s*\(", regex::escape(name)))
}

/// Outcome of a content scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    /// Carries the offending function name
    Denied(String),
}

/// Compiled deny-list
#[derive(Debug, Clone)]
pub struct ContentPolicy {
    markers: Vec<String>,
    patterns: Vec<(String, Regex)>,
}

impl ContentPolicy {
    /// Builds the policy from configured markers and function names.
    pub fn new<M, N>(markers: &[M], names: &[N]) -> Result<Self, regex::Error>
    where
        M: AsRef<str>,
        N: AsRef<str>,
    {
        let markers = markers
            .iter()
            .map(|m| m.as_ref().trim().to_ascii_lowercase())
            .filter(|m| !m.is_empty())
            .collect();

        let mut patterns = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            patterns.push((name.to_string(), compile_pattern(name)?));
        }

        Ok(Self { markers, patterns })
    }

    /// True when the content contains any script marker
    pub fn is_executable(&self, content: &str) -> bool {
        let lowered = content.to_ascii_lowercase();
        self.markers.iter().any(|marker| lowered.contains(marker))
    }

    /// Scans `content`; plain text without script markers is always allowed.
    pub fn scan(&self, content: &str) -> Verdict {
        if !self.is_executable(content) {
            return Verdict::Allowed;
        }

        self.patterns
            .iter()
            .find(|(_, pattern)| pattern.is_match(content))
            .map(|(name, _)| Verdict::Denied(name.clone()))
            .unwrap_or(Verdict::Allowed)
    }
}

impl Default for ContentPolicy {
    fn default() -> Self {
        let names = DEFAULT_DANGEROUS_FUNCTIONS;
        let patterns = names
            .iter()
            .filter_map(|name| {
                compile_pattern(name)
                    .ok()
                    .map(|pattern| (name.to_string(), pattern))
            })
            .collect();

        Self {
            markers: DEFAULT_SCRIPT_MARKERS.iter().map(|m| m.to_string()).collect(),
            patterns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_always_allowed() {
        let policy = ContentPolicy::default();
        assert_eq!(policy.scan("call eval( here, no script tag"), Verdict::Allowed);
    }

    #[test]
    fn eval_after_php_tag_is_denied() {
        let policy = ContentPolicy::default();
        assert_eq!(
            policy.scan("<?php eval($_GET['x']); ?>"),
            Verdict::Denied("eval".into())
        );
    }

    #[test]
    fn match_ignores_case_and_whitespace_before_paren() {
        let policy = ContentPolicy::default();
        assert_eq!(
            policy.scan("<?PHP\nSHELL_EXEC  ('ls');"),
            Verdict::Denied("shell_exec".into())
        );
    }

    #[test]
    fn word_boundary_prevents_false_positives() {
        let policy = ContentPolicy::default();
        let content = "<?php my_filesystem_check(); $evaluation = 1; get_template_part('x');";
        assert_eq!(policy.scan(content), Verdict::Allowed);
    }

    #[test]
    fn short_echo_tag_counts_as_script() {
        let policy = ContentPolicy::default();
        assert_eq!(
            policy.scan("<p><?= system('id') ?></p>"),
            Verdict::Denied("system".into())
        );
    }

    #[test]
    fn deny_list_is_extendable() {
        let policy = ContentPolicy::new(&["<?php"], &["proc_open", "popen"]).unwrap();
        assert_eq!(
            policy.scan("<?php $p = proc_open('sh', [], $pipes);"),
            Verdict::Denied("proc_open".into())
        );
        assert_eq!(policy.scan("<?php eval('1');"), Verdict::Allowed);
    }
}
