use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dialogue::{AgentConfig, Transcript};
use crate::error::{ConfigurationError, CritiqueError};
use crate::provider::{ModelClient, RoutingMode};
use crate::registry::ProviderRegistry;
use crate::validator::ValidationLimits;

use super::judge::{choose_judge_model, choose_judge_provider, JudgeSelection, JudgeUniverse};
use super::prompt::{critique_prompt, revision_prompt};
use super::revision::{parse_revision, RevisedTranscript};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CritiqueSettings {
    pub critique_max_tokens: u32,
    /// Floor for the revision budget; longer dialogues get more.
    pub revision_max_tokens: u32,
    /// Per-turn token budget the poems were written with.
    pub turn_max_tokens: u32,
    /// The validator's prompt ceiling; judge prompts are sized to it.
    pub max_prompt_chars: usize,
    /// The validator's token ceiling.
    pub max_tokens: u32,
    /// Lets an exhausted direct universe fall back to the gateway.
    pub gateway_fallback: bool,
}

impl Default for CritiqueSettings {
    fn default() -> Self {
        let limits = ValidationLimits::default();
        Self {
            critique_max_tokens: 800,
            revision_max_tokens: 1_200,
            turn_max_tokens: 300,
            max_prompt_chars: limits.max_prompt_chars,
            max_tokens: limits.max_tokens,
            gateway_fallback: true,
        }
    }
}

impl CritiqueSettings {
    /// Tokens to allow for rewriting `turns` poems: room for every poem at its
    /// original budget, at least `revision_max_tokens`, at most `max_tokens`.
    pub fn revision_tokens(&self, turns: usize) -> u32 {
        let turns = u32::try_from(turns).unwrap_or(u32::MAX);
        turns
            .saturating_mul(self.turn_max_tokens)
            .max(self.revision_max_tokens)
            .min(self.max_tokens)
    }
}

/// The judge's critique of one transcript. The text is opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CritiqueReport {
    pub judge: JudgeSelection,
    pub theme: String,
    pub text: String,
}

/// Judge selection, critique and revision over a finished transcript.
///
/// The transcript is only ever read; revision builds a separate one.
#[derive(Debug, Clone)]
pub struct CritiquePipeline {
    registry: Arc<ProviderRegistry>,
    settings: CritiqueSettings,
}

impl CritiquePipeline {
    pub fn new(registry: Arc<ProviderRegistry>, settings: CritiqueSettings) -> Self {
        Self { registry, settings }
    }

    pub fn settings(&self) -> &CritiqueSettings {
        &self.settings
    }

    fn universe(&self) -> JudgeUniverse {
        JudgeUniverse {
            direct: self.registry.available_direct(),
            gateway: self.registry.gateway_available(),
            gateway_fallback: self.settings.gateway_fallback,
        }
    }

    /// Picks a judge whose provider neither agent uses, then its model.
    pub async fn select_judge(
        &self,
        agent_a: &AgentConfig,
        agent_b: &AgentConfig,
    ) -> Result<JudgeSelection, ConfigurationError> {
        let candidate = choose_judge_provider([agent_a, agent_b], &self.universe())?;
        let identity = candidate.identity;
        let catalog = self.registry.catalog(identity).await?;
        let named_default = match identity.routing {
            RoutingMode::Direct => self.registry.default_model(identity),
            RoutingMode::Gateway => None,
        };
        let avoid = [
            agent_a.model.model_id.as_str(),
            agent_b.model.model_id.as_str(),
        ];
        let judge_model = choose_judge_model(&catalog, named_default.as_deref(), &avoid)
            .ok_or(ConfigurationError::NoJudgeAvailable)?;

        log::info!(
            "Selected judge {} ({}): {}",
            identity,
            judge_model.model_id,
            candidate.rationale
        );
        Ok(JudgeSelection {
            judge_provider: identity,
            judge_model,
            rationale: candidate.rationale,
        })
    }

    fn judge_client(&self, judge: &JudgeSelection) -> Result<ModelClient, ConfigurationError> {
        self.registry
            .resolve(judge.judge_provider)?
            .bind(judge.judge_model.clone())
    }

    /// Sends the whole transcript to the judge for a critique.
    pub async fn critique(
        &self,
        judge: &JudgeSelection,
        theme: &str,
        transcript: &Transcript,
    ) -> Result<CritiqueReport, CritiqueError> {
        let form = match transcript.turns().first() {
            Some(turn) => &turn.form,
            None => {
                return Err(ConfigurationError::InvalidSession(
                    "cannot critique an empty transcript".into(),
                )
                .into())
            }
        };
        let client = self.judge_client(judge)?;
        let prompt = critique_prompt(theme, form, transcript, self.settings.max_prompt_chars);
        log::debug!(
            "Requesting critique of {} turns from {}",
            transcript.len(),
            judge.judge_provider
        );
        let text = client
            .generate_poetry(&prompt, self.settings.critique_max_tokens)
            .await?;
        Ok(CritiqueReport {
            judge: judge.clone(),
            theme: theme.to_string(),
            text,
        })
    }

    /// Asks the judge for a rewrite guided by `report` and checks it keeps the
    /// original's structure.
    pub async fn revise(
        &self,
        transcript: &Transcript,
        report: &CritiqueReport,
    ) -> Result<RevisedTranscript, CritiqueError> {
        let form = match transcript.turns().first() {
            Some(turn) => &turn.form,
            None => {
                return Err(ConfigurationError::InvalidSession(
                    "cannot revise an empty transcript".into(),
                )
                .into())
            }
        };
        let client = self.judge_client(&report.judge)?;
        let prompt = revision_prompt(
            &report.theme,
            form,
            transcript,
            &report.text,
            self.settings.max_prompt_chars,
        )?;
        let text = client
            .generate_poetry(&prompt, self.settings.revision_tokens(transcript.len()))
            .await?;
        parse_revision(transcript, &text)
    }
}
