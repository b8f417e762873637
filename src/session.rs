//! One complete run: configuration, dialogue, then critique.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::{AgentSpec, AppConfig, SessionConfig};
use crate::critique::{CritiquePipeline, CritiqueReport};
use crate::dialogue::{
    AgentConfig, DialogueEvent, DialogueOrchestrator, DialoguePlan, Participant, Transcript,
};
use crate::error::{ConfigurationError, CritiqueError, DuetError};
use crate::forms::FormConstraints;
use crate::registry::ProviderRegistry;

/// Everything a session produced, for an external formatter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionOutput {
    pub title: Option<String>,
    pub theme: String,
    pub form: FormConstraints,
    pub agent_a: AgentConfig,
    pub agent_b: AgentConfig,
    pub original_transcript: Transcript,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critique_report: Option<CritiqueReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revised_transcript: Option<Transcript>,
    /// Why critique or revision is missing, when it is.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Runs sessions against a shared registry.
#[derive(Debug, Clone)]
pub struct SessionRunner {
    registry: Arc<ProviderRegistry>,
    config: AppConfig,
    cancel: CancellationToken,
    events: Option<mpsc::UnboundedSender<DialogueEvent>>,
}

impl SessionRunner {
    pub fn new(registry: Arc<ProviderRegistry>, config: AppConfig) -> Self {
        Self {
            registry,
            config,
            cancel: CancellationToken::new(),
            events: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_events(mut self, sender: mpsc::UnboundedSender<DialogueEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    async fn agent(
        &self,
        session: &SessionConfig,
        spec: &AgentSpec,
    ) -> Result<AgentConfig, ConfigurationError> {
        let identity = session.identity(spec)?;
        let model = self
            .registry
            .select_model(identity, spec.model.as_deref())
            .await?;
        Ok(AgentConfig::new(spec.name.trim(), model))
    }

    /// Runs the dialogue and then, when a disjoint judge exists, the critique.
    ///
    /// Configuration problems and dialogue failures are errors. A missing
    /// judge or a failed critique only leaves the critique out of the output.
    pub async fn run(&self, session: &SessionConfig) -> Result<SessionOutput, DuetError> {
        let form = session.validate()?;
        let (agent_a, agent_b) = futures::try_join!(
            self.agent(session, &session.agent_a),
            self.agent(session, &session.agent_b)
        )?;
        let participant_a = Participant::resolve(&self.registry, agent_a.clone())?;
        let participant_b = Participant::resolve(&self.registry, agent_b.clone())?;

        let plan = DialoguePlan::new(session.theme.trim(), form.clone(), session.rounds);
        let mut orchestrator = DialogueOrchestrator::new(
            plan,
            self.config.dialogue_settings(session.title),
            participant_a,
            participant_b,
        )?
        .with_cancellation(self.cancel.clone());
        if let Some(sender) = &self.events {
            orchestrator.set_event_sender(sender.clone());
        }
        let outcome = orchestrator.run().await?;

        let mut output = SessionOutput {
            title: outcome.title,
            theme: session.theme.trim().to_string(),
            form,
            agent_a,
            agent_b,
            original_transcript: outcome.transcript,
            critique_report: None,
            revised_transcript: None,
            notes: Vec::new(),
        };
        self.critique(&mut output).await?;
        Ok(output)
    }

    async fn critique(&self, output: &mut SessionOutput) -> Result<(), DuetError> {
        let pipeline =
            CritiquePipeline::new(Arc::clone(&self.registry), self.config.critique_settings());
        let judge = match pipeline.select_judge(&output.agent_a, &output.agent_b).await {
            Ok(judge) => judge,
            Err(ConfigurationError::NoJudgeAvailable) => {
                log::warn!("No judge distinct from both agents; skipping critique");
                output
                    .notes
                    .push(ConfigurationError::NoJudgeAvailable.to_string());
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let report = match pipeline
            .critique(&judge, &output.theme, &output.original_transcript)
            .await
        {
            Ok(report) => report,
            Err(err) => {
                log::warn!("Critique failed: {err}");
                output.notes.push(format!("critique failed: {err}"));
                return Ok(());
            }
        };

        match pipeline.revise(&output.original_transcript, &report).await {
            Ok(revised) => output.revised_transcript = Some(revised),
            Err(err @ CritiqueError::StructureMismatch { .. }) => {
                log::warn!("Discarding revision: {err}");
                output.notes.push(format!("revision discarded: {err}"));
            }
            Err(err) => {
                log::warn!("Revision failed: {err}");
                output.notes.push(format!("revision failed: {err}"));
            }
        }
        output.critique_report = Some(report);
        Ok(())
    }
}

/// Runs one session with default cancellation and no event listener.
pub async fn run_session(
    registry: Arc<ProviderRegistry>,
    config: AppConfig,
    session: &SessionConfig,
) -> Result<SessionOutput, DuetError> {
    SessionRunner::new(registry, config).run(session).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::AgentSlot;
    use crate::error::{DialogueFailure, LLMError};
    use crate::provider::{ProviderIdentity, Vendor};
    use crate::registry::Credentials;
    use crate::resilient::ResilienceConfig;
    use crate::testing::{ScriptedBackend, ScriptedFactory};

    fn registry(factory: &ScriptedFactory, credentials: Credentials) -> Arc<ProviderRegistry> {
        Arc::new(
            ProviderRegistry::builder()
                .credentials(credentials)
                .factory(Arc::new(factory.clone()))
                .resilience(ResilienceConfig {
                    max_attempts: 1,
                    base_delay_ms: 1,
                    max_delay_ms: 1,
                    jitter: false,
                    timeout_secs: 5,
                })
                .build(),
        )
    }

    fn direct_credentials() -> Credentials {
        Credentials::new()
            .with("ANTHROPIC_API_KEY", "a")
            .with("GEMINI_API_KEY", "g")
            .with("OPENAI_API_KEY", "o")
    }

    fn snow_session() -> SessionConfig {
        SessionConfig::new(
            "a walk in the snow",
            "haiku",
            1,
            AgentSpec::new("Ada", "anthropic"),
            AgentSpec::new("Basho", "openai"),
        )
    }

    #[tokio::test]
    async fn snow_walk_runs_end_to_end_with_a_disjoint_judge() {
        let anthropic = ProviderIdentity::direct(Vendor::Anthropic);
        let openai = ProviderIdentity::direct(Vendor::OpenAI);
        let google = ProviderIdentity::direct(Vendor::Google);
        let factory = ScriptedFactory::new()
            .with(
                anthropic,
                ScriptedBackend::replying(["Footfalls in White", "fresh snow underfoot"]),
            )
            .with(openai, ScriptedBackend::replying(["each step a soft hush"]))
            .with(
                google,
                ScriptedBackend::replying([
                    "Thematic coherence: 9/10.",
                    "**Ada:**\nfresh snow beneath boots\n\n**Basho:**\neach step hushes the pines",
                ]),
            );
        let output = run_session(
            registry(&factory, direct_credentials()),
            AppConfig::default(),
            &snow_session(),
        )
        .await
        .unwrap();

        let turns = output.original_transcript.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(
            turns.iter().map(|t| t.ordinal).collect::<Vec<_>>(),
            vec![0, 1]
        );
        assert_eq!(
            turns.iter().map(|t| t.slot).collect::<Vec<_>>(),
            vec![AgentSlot::A, AgentSlot::B]
        );
        assert_eq!(turns[0].speaker.provider, anthropic);
        assert_eq!(turns[1].speaker.provider, openai);
        assert_eq!(output.title.as_deref(), Some("Footfalls in White"));

        let report = output.critique_report.as_ref().unwrap();
        assert_eq!(report.judge.judge_provider, google);
        assert_ne!(report.judge.judge_provider.vendor, Vendor::Anthropic);
        assert_ne!(report.judge.judge_provider.vendor, Vendor::OpenAI);

        let revised = output.revised_transcript.as_ref().unwrap();
        assert_eq!(revised.len(), 2);
        assert_eq!(revised.turns()[1].speaker.name, "Basho");
        assert_eq!(turns[1].text, "each step a soft hush");
        assert!(output.notes.is_empty());
    }

    #[tokio::test]
    async fn without_a_disjoint_judge_the_transcript_is_the_deliverable() {
        let factory = ScriptedFactory::new();
        let credentials = Credentials::new()
            .with("ANTHROPIC_API_KEY", "a")
            .with("OPENAI_API_KEY", "o");
        let output = run_session(
            registry(&factory, credentials),
            AppConfig::default(),
            &snow_session(),
        )
        .await
        .unwrap();

        assert_eq!(output.original_transcript.len(), 2);
        assert!(output.critique_report.is_none());
        assert!(output.revised_transcript.is_none());
        assert_eq!(output.notes.len(), 1);
    }

    #[tokio::test]
    async fn malformed_revision_keeps_the_critique() {
        let google = ProviderIdentity::direct(Vendor::Google);
        let factory = ScriptedFactory::new().with(
            google,
            ScriptedBackend::replying(["A thoughtful critique.", "no structure here"]),
        );
        let output = run_session(
            registry(&factory, direct_credentials()),
            AppConfig::default(),
            &snow_session(),
        )
        .await
        .unwrap();

        assert!(output.critique_report.is_some());
        assert!(output.revised_transcript.is_none());
        assert!(output.notes[0].starts_with("revision discarded"));
    }

    #[tokio::test]
    async fn dialogue_failure_carries_the_partial_transcript() {
        let openai = ProviderIdentity::direct(Vendor::OpenAI);
        let factory = ScriptedFactory::new().with(
            openai,
            ScriptedBackend::failing(LLMError::AuthError("rejected".into())),
        );
        let err = run_session(
            registry(&factory, direct_credentials()),
            AppConfig::default(),
            &snow_session(),
        )
        .await
        .unwrap_err();

        match err {
            DuetError::Dialogue(err) => {
                assert_eq!(err.ordinal, 1);
                assert_eq!(err.transcript.len(), 1);
                assert!(matches!(err.kind, DialogueFailure::Call(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_generation() {
        let anthropic = ProviderIdentity::direct(Vendor::Anthropic);
        let backend = ScriptedBackend::replying(["never"]);
        let factory = ScriptedFactory::new().with(anthropic, backend.clone());
        let credentials = Credentials::new().with("ANTHROPIC_API_KEY", "a");
        let err = run_session(
            registry(&factory, credentials),
            AppConfig::default(),
            &snow_session(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            DuetError::Configuration(ConfigurationError::MissingCredential { .. })
        ));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn output_serializes_without_empty_sections() {
        let factory = ScriptedFactory::new();
        let credentials = Credentials::new()
            .with("ANTHROPIC_API_KEY", "a")
            .with("OPENAI_API_KEY", "o");
        let mut session = snow_session();
        session.title = false;
        let output = run_session(registry(&factory, credentials), AppConfig::default(), &session)
            .await
            .unwrap();
        let json = serde_json::to_value(&output).unwrap();
        assert!(json.get("critique_report").is_none());
        assert_eq!(json["original_transcript"].as_array().unwrap().len(), 2);
        assert_eq!(json["original_transcript"][0]["speaker"]["name"], "Ada");
    }
}
