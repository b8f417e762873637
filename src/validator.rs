#[path = "validator/rules.rs"]
mod rules;

#[path = "validator/redact.rs"]
mod redact;

#[path = "validator/request.rs"]
mod request;

pub use redact::{bounded_excerpt, redact_secrets};
pub use request::{RequestValidator, ValidationLimits, ValidationResult};
pub use rules::{PatternCategory, Rule, RuleAction, RuleTable, RULESET_VERSION};
