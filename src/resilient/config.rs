use serde::{Deserialize, Serialize};

/// Configuration for retry, backoff and per-attempt timeouts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Maximum number of attempts including the first one
    pub max_attempts: usize,
    /// Initial backoff delay in milliseconds
    pub base_delay_ms: u64,
    /// Maximum backoff delay in milliseconds
    pub max_delay_ms: u64,
    /// Whether to shave a deterministic jitter off backoff delays
    pub jitter: bool,
    /// Time budget for a single attempt
    pub timeout_secs: u64,
}

const DEFAULT_MAX_ATTEMPTS: usize = 3;
const DEFAULT_BASE_DELAY_MS: u64 = 500;
const DEFAULT_MAX_DELAY_MS: u64 = 8_000;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

impl ResilienceConfig {
    pub fn defaults() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            jitter: true,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Backoff before retry number `attempt_index + 1`.
    pub fn delay_ms(&self, attempt_index: usize) -> u64 {
        let mut delay = self
            .base_delay_ms
            .saturating_mul(1u64 << attempt_index.min(16))
            .min(self.max_delay_ms);
        if self.jitter {
            let span = (delay / 2).max(1);
            let jitter = ((attempt_index as u64)
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1))
                % span;
            delay = delay.saturating_sub(jitter);
        }
        delay
    }
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_and_cap() {
        let cfg = ResilienceConfig {
            jitter: false,
            ..ResilienceConfig::defaults()
        };
        assert_eq!(cfg.delay_ms(0), 500);
        assert_eq!(cfg.delay_ms(1), 1_000);
        assert_eq!(cfg.delay_ms(10), 8_000);
    }

    #[test]
    fn jitter_never_exceeds_the_unjittered_delay() {
        let cfg = ResilienceConfig::defaults();
        for idx in 0..8 {
            let plain = ResilienceConfig {
                jitter: false,
                ..cfg.clone()
            }
            .delay_ms(idx);
            assert!(cfg.delay_ms(idx) <= plain);
            assert!(cfg.delay_ms(idx) >= plain / 2);
        }
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: ResilienceConfig = toml::from_str("max_attempts = 5").unwrap();
        assert_eq!(cfg.max_attempts, 5);
        assert_eq!(cfg.timeout_secs, 60);
    }
}
