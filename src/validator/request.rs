use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationReason};

use super::redact::{bounded_excerpt, redact_secrets};
use super::rules::{PatternCategory, RuleAction, RuleTable};

const LOG_EXCERPT_CHARS: usize = 80;

/// Bounds enforced on every outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationLimits {
    pub max_prompt_chars: usize,
    pub max_model_id_len: usize,
    pub max_tokens: u32,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_prompt_chars: 10_000,
            max_model_id_len: 200,
            max_tokens: 8_000,
        }
    }
}

/// Outcome of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_safe: bool,
    pub sanitized_text: String,
    /// Categories whose strip rules fired.
    pub flagged_patterns: BTreeSet<PatternCategory>,
}

impl ValidationResult {
    pub fn sanitized_text(&self) -> &str {
        &self.sanitized_text
    }

    pub fn flagged_names(&self) -> Vec<&'static str> {
        self.flagged_patterns.iter().map(|c| c.as_str()).collect()
    }
}

/// Gate in front of every model call.
///
/// Rejects prompts matching a reject rule, strips role-redefinition and
/// markup/code phrasing, and checks the model id and token bound. A prompt
/// with nothing meaningful left after stripping is rejected rather than sent.
#[derive(Debug, Clone, Default)]
pub struct RequestValidator {
    rules: RuleTable,
    limits: ValidationLimits,
}

fn model_id_charset() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._/:\-]+$").expect("model id pattern compiles"))
}

impl RequestValidator {
    pub fn new(rules: RuleTable, limits: ValidationLimits) -> Self {
        Self { rules, limits }
    }

    pub fn with_limits(limits: ValidationLimits) -> Self {
        Self::new(RuleTable::builtin(), limits)
    }

    pub fn limits(&self) -> ValidationLimits {
        self.limits
    }

    pub fn rules_version(&self) -> &str {
        self.rules.version()
    }

    pub fn validate(
        &self,
        prompt: &str,
        model_id: &str,
        max_tokens: u32,
    ) -> Result<ValidationResult, ValidationError> {
        self.check_token_bound(max_tokens)?;
        self.check_model_id(model_id)?;

        if prompt.chars().count() > self.limits.max_prompt_chars {
            log::warn!(
                "Rejected prompt: {} chars exceeds limit of {}",
                prompt.chars().count(),
                self.limits.max_prompt_chars
            );
            return Err(ValidationError::new(ValidationReason::PromptTooLong));
        }

        for rule in self.rules.rules() {
            if rule.action != RuleAction::Reject {
                continue;
            }
            if let Some(found) = rule.pattern.find(prompt) {
                log::warn!(
                    "Rejected prompt (rules v{}): category={} excerpt={:?}",
                    self.rules.version(),
                    rule.category,
                    bounded_excerpt(&redact_secrets(found.as_str()), LOG_EXCERPT_CHARS)
                );
                return Err(ValidationError::unsafe_prompt(Some(rule.category)));
            }
        }

        let mut flagged = BTreeSet::new();
        let mut text = prompt.to_string();
        for rule in self.rules.rules() {
            if rule.action != RuleAction::Strip || !rule.pattern.is_match(&text) {
                continue;
            }
            flagged.insert(rule.category);
            text = rule.pattern.replace_all(&text, "").into_owned();
        }
        let text = strip_control_chars(&text);
        let text = text.trim();

        if !text.chars().any(char::is_alphanumeric) {
            log::warn!(
                "Rejected prompt: nothing left after sanitization (flagged: {:?})",
                flagged
            );
            return Err(ValidationError::unsafe_prompt(flagged.iter().next().copied()));
        }

        if !flagged.is_empty() {
            log::info!("Sanitized prompt, stripped categories {:?}", flagged);
        }

        Ok(ValidationResult {
            is_safe: flagged.is_empty(),
            sanitized_text: text.to_string(),
            flagged_patterns: flagged,
        })
    }

    fn check_token_bound(&self, max_tokens: u32) -> Result<(), ValidationError> {
        if max_tokens == 0 || max_tokens > self.limits.max_tokens {
            log::warn!(
                "Rejected request: max_tokens={} outside 1..={}",
                max_tokens,
                self.limits.max_tokens
            );
            return Err(ValidationError::new(ValidationReason::InvalidTokenBound));
        }
        Ok(())
    }

    fn check_model_id(&self, model_id: &str) -> Result<(), ValidationError> {
        let valid = !model_id.is_empty()
            && model_id.len() <= self.limits.max_model_id_len
            && model_id_charset().is_match(model_id)
            && !model_id.contains("..")
            && !model_id.contains("//")
            && !model_id.starts_with('/');
        if !valid {
            log::warn!(
                "Rejected request: invalid model id {:?}",
                bounded_excerpt(model_id, LOG_EXCERPT_CHARS)
            );
            return Err(ValidationError::new(ValidationReason::InvalidModelId));
        }
        Ok(())
    }
}

fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}
