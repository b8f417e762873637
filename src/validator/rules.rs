use std::fmt;
use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Version of the built-in rule table. Bump when patterns change.
pub const RULESET_VERSION: &str = "2";

/// Family of attack phrasing a rule detects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    InstructionOverride,
    PromptExfiltration,
    SafetyBypass,
    RoleRedefinition,
    MarkupInjection,
    CodeInjection,
}

impl PatternCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            PatternCategory::InstructionOverride => "instruction_override",
            PatternCategory::PromptExfiltration => "prompt_exfiltration",
            PatternCategory::SafetyBypass => "safety_bypass",
            PatternCategory::RoleRedefinition => "role_redefinition",
            PatternCategory::MarkupInjection => "markup_injection",
            PatternCategory::CodeInjection => "code_injection",
        }
    }
}

impl fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the validator does when a rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    /// Refuse the whole call.
    Reject,
    /// Remove the matched text and continue.
    Strip,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: Regex,
    pub category: PatternCategory,
    pub action: RuleAction,
}

/// Ordered pattern → category table consumed by the validator.
#[derive(Debug, Clone)]
pub struct RuleTable {
    version: String,
    rules: Vec<Rule>,
}

const BUILTIN: &[(&str, PatternCategory, RuleAction)] = &[
    (
        r"(ignore|forget|disregard|override)\s+(all\s+)?(the\s+)?(previous|prior|above)\s+instructions",
        PatternCategory::InstructionOverride,
        RuleAction::Reject,
    ),
    (r"new\s+instructions\s*:", PatternCategory::InstructionOverride, RuleAction::Reject),
    (r"system\s*:\s*new\s+role", PatternCategory::InstructionOverride, RuleAction::Reject),
    (r"reveal\s+your\s+(system\s+)?prompt", PatternCategory::PromptExfiltration, RuleAction::Reject),
    (r"show\s+me\s+your\s+instructions", PatternCategory::PromptExfiltration, RuleAction::Reject),
    (r"what\s+are\s+your\s+instructions", PatternCategory::PromptExfiltration, RuleAction::Reject),
    (r"(bypass|disable)\s+safety", PatternCategory::SafetyBypass, RuleAction::Reject),
    (r"jailbreak", PatternCategory::SafetyBypass, RuleAction::Reject),
    (r"uncensored\s+mode", PatternCategory::SafetyBypass, RuleAction::Reject),
    (r"developer\s+mode", PatternCategory::SafetyBypass, RuleAction::Reject),
    (r"admin\s+override", PatternCategory::SafetyBypass, RuleAction::Reject),
    (r"sudo\s+mode", PatternCategory::SafetyBypass, RuleAction::Reject),
    (r"you\s+are\s+now", PatternCategory::RoleRedefinition, RuleAction::Strip),
    (r"pretend\s+to\s+be", PatternCategory::RoleRedefinition, RuleAction::Strip),
    (r"act\s+as\s+a\s+different", PatternCategory::RoleRedefinition, RuleAction::Strip),
    (r"roleplay\s+as", PatternCategory::RoleRedefinition, RuleAction::Strip),
    (r"simulate\s+being", PatternCategory::RoleRedefinition, RuleAction::Strip),
    (r"break\s+character", PatternCategory::RoleRedefinition, RuleAction::Strip),
    (r"<script[^>]*>.*?</script\s*>", PatternCategory::MarkupInjection, RuleAction::Strip),
    (r"</?script[^>]*>", PatternCategory::MarkupInjection, RuleAction::Strip),
    (r"<iframe[^>]*>", PatternCategory::MarkupInjection, RuleAction::Strip),
    (r"javascript\s*:", PatternCategory::MarkupInjection, RuleAction::Strip),
    (r"data:text/html", PatternCategory::MarkupInjection, RuleAction::Strip),
    (r"\bon(load|error|click|mouseover)\s*=", PatternCategory::MarkupInjection, RuleAction::Strip),
    (r"\beval\s*\(", PatternCategory::CodeInjection, RuleAction::Strip),
    (r"\bexec\s*\(", PatternCategory::CodeInjection, RuleAction::Strip),
    (r"import\s+(os|subprocess)\b", PatternCategory::CodeInjection, RuleAction::Strip),
    (r"__import__", PatternCategory::CodeInjection, RuleAction::Strip),
    (r"\b(get|set|del)attr\s*\(", PatternCategory::CodeInjection, RuleAction::Strip),
];

impl RuleTable {
    /// Compiles a table. Patterns are matched case-insensitively, `.` spans newlines.
    pub fn new(
        version: impl Into<String>,
        patterns: &[(&str, PatternCategory, RuleAction)],
    ) -> Result<Self, regex::Error> {
        let rules = patterns
            .iter()
            .map(|(pattern, category, action)| {
                Ok(Rule {
                    pattern: RegexBuilder::new(pattern)
                        .case_insensitive(true)
                        .dot_matches_new_line(true)
                        .build()?,
                    category: *category,
                    action: *action,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self {
            version: version.into(),
            rules,
        })
    }

    /// The maintained table of known attack phrasings.
    pub fn builtin() -> Self {
        static TABLE: OnceLock<RuleTable> = OnceLock::new();
        TABLE
            .get_or_init(|| {
                RuleTable::new(RULESET_VERSION, BUILTIN).expect("built-in rule patterns compile")
            })
            .clone()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_compiles_and_is_versioned() {
        let table = RuleTable::builtin();
        assert_eq!(table.version(), RULESET_VERSION);
        assert_eq!(table.rules().len(), BUILTIN.len());
    }

    #[test]
    fn custom_tables_swap_in() {
        let table = RuleTable::new(
            "test-1",
            &[("forbidden", PatternCategory::SafetyBypass, RuleAction::Reject)],
        )
        .unwrap();
        assert!(table.rules()[0].pattern.is_match("FORBIDDEN words"));
    }

    #[test]
    fn invalid_patterns_are_reported() {
        let result = RuleTable::new(
            "bad",
            &[("(unclosed", PatternCategory::SafetyBypass, RuleAction::Reject)],
        );
        assert!(result.is_err());
    }
}
