use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{ConfigurationError, DialogueError, DialogueFailure};
use crate::forms::FormConstraints;
use crate::provider::ModelClient;
use crate::registry::ProviderRegistry;

use super::events::DialogueEvent;
use super::prompt::PromptBuilder;
use super::state::DialogueState;
use super::types::{AgentConfig, AgentSlot, Transcript, Turn};

/// Token and context limits for one dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogueSettings {
    pub turn_max_tokens: u32,
    pub title_max_tokens: u32,
    pub context_char_budget: usize,
    pub generate_title: bool,
}

impl Default for DialogueSettings {
    fn default() -> Self {
        Self {
            turn_max_tokens: 300,
            title_max_tokens: 20,
            context_char_budget: 6_000,
            generate_title: true,
        }
    }
}

/// What to talk about and for how long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialoguePlan {
    pub theme: String,
    pub form: FormConstraints,
    pub rounds: u32,
}

impl DialoguePlan {
    pub fn new(theme: impl Into<String>, form: FormConstraints, rounds: u32) -> Self {
        Self {
            theme: theme.into(),
            form,
            rounds,
        }
    }

    /// One round is one turn per agent.
    pub fn total_turns(&self) -> usize {
        2 * self.rounds as usize
    }
}

/// An agent together with the client that speaks for it.
#[derive(Debug, Clone)]
pub struct Participant {
    pub config: AgentConfig,
    pub client: ModelClient,
}

impl Participant {
    pub fn new(config: AgentConfig, client: ModelClient) -> Self {
        Self { config, client }
    }

    /// Resolves the agent's provider through the registry and binds its model.
    pub fn resolve(
        registry: &ProviderRegistry,
        config: AgentConfig,
    ) -> Result<Self, ConfigurationError> {
        let provider = registry.resolve(config.provider)?;
        let client = provider.bind(config.model.clone())?;
        Ok(Self { config, client })
    }
}

/// Finished dialogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueOutcome {
    pub title: Option<String>,
    pub transcript: Transcript,
}

/// Drives the strictly sequential A, B, A, B, … exchange.
///
/// Turn `n + 1` is never requested before turn `n` is committed. A failed or
/// aborted call appends nothing; the error carries the partial transcript and
/// the ordinal that failed, and the same ordinal can be retried with
/// [`Self::step`].
pub struct DialogueOrchestrator {
    plan: DialoguePlan,
    settings: DialogueSettings,
    participants: [Participant; 2],
    prompts: PromptBuilder,
    state: DialogueState,
    transcript: Transcript,
    title: Option<String>,
    cancel: CancellationToken,
    event_sender: Option<mpsc::UnboundedSender<DialogueEvent>>,
}

impl DialogueOrchestrator {
    pub fn new(
        plan: DialoguePlan,
        settings: DialogueSettings,
        agent_a: Participant,
        agent_b: Participant,
    ) -> Result<Self, ConfigurationError> {
        if plan.rounds < 1 {
            return Err(ConfigurationError::InvalidRoundCount(plan.rounds));
        }
        if plan.theme.trim().is_empty() {
            return Err(ConfigurationError::InvalidSession("theme is empty".into()));
        }
        let prompts = PromptBuilder::new(
            plan.theme.trim(),
            plan.form.clone(),
            settings.context_char_budget,
        );
        Ok(Self {
            plan,
            settings,
            participants: [agent_a, agent_b],
            prompts,
            state: DialogueState::Idle,
            transcript: Transcript::new(),
            title: None,
            cancel: CancellationToken::new(),
            event_sender: None,
        })
    }

    /// Builds both participants from the registry. Missing credentials
    /// surface here, before any turn is requested.
    pub fn from_registry(
        registry: &ProviderRegistry,
        plan: DialoguePlan,
        settings: DialogueSettings,
        agent_a: AgentConfig,
        agent_b: AgentConfig,
    ) -> Result<Self, ConfigurationError> {
        let a = Participant::resolve(registry, agent_a)?;
        let b = Participant::resolve(registry, agent_b)?;
        Self::new(plan, settings, a, b)
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn set_event_sender(&mut self, sender: mpsc::UnboundedSender<DialogueEvent>) {
        self.event_sender = Some(sender);
    }

    pub fn create_event_channel(&mut self) -> mpsc::UnboundedReceiver<DialogueEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.event_sender = Some(tx);
        rx
    }

    pub fn state(&self) -> DialogueState {
        self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn plan(&self) -> &DialoguePlan {
        &self.plan
    }

    pub fn agent(&self, slot: AgentSlot) -> &AgentConfig {
        &self.participant(slot).config
    }

    fn participant(&self, slot: AgentSlot) -> &Participant {
        match slot {
            AgentSlot::A => &self.participants[0],
            AgentSlot::B => &self.participants[1],
        }
    }

    /// `Idle → AwaitingTurn(A)`. Also asks Agent A's model for a title when
    /// enabled; a failed title is logged and left empty.
    pub async fn start(&mut self) -> Result<(), DialogueError> {
        if self.state != DialogueState::Idle {
            return Err(self.failure(DialogueFailure::InvalidState(self.state.name())));
        }
        self.state = DialogueState::started();
        self.emit(DialogueEvent::Started {
            theme: self.plan.theme.clone(),
            total_turns: self.plan.total_turns(),
        });
        log::info!(
            "Starting dialogue: {} rounds of {} between {} and {}",
            self.plan.rounds,
            self.plan.form,
            self.agent(AgentSlot::A).name,
            self.agent(AgentSlot::B).name
        );

        if self.settings.generate_title {
            self.title = self.generate_title().await;
            if let Some(title) = &self.title {
                self.emit(DialogueEvent::TitleGenerated {
                    title: title.clone(),
                });
            }
        }
        Ok(())
    }

    async fn generate_title(&self) -> Option<String> {
        let client = &self.participant(AgentSlot::A).client;
        let prompt = self.prompts.title();
        let call = client.generate_poetry(&prompt, self.settings.title_max_tokens);
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            result = call => result,
        };
        match result {
            Ok(raw) => clean_title(&raw),
            Err(err) => {
                log::warn!("Title generation failed, continuing without a title: {err}");
                None
            }
        }
    }

    /// Produces exactly one turn and returns it.
    pub async fn step(&mut self) -> Result<&Turn, DialogueError> {
        let slot = match self.state {
            DialogueState::AwaitingTurn(slot) => slot,
            other => return Err(self.failure(DialogueFailure::InvalidState(other.name()))),
        };
        let ordinal = self.transcript.len();
        if self.cancel.is_cancelled() {
            return Err(self.fail_turn(ordinal, DialogueFailure::Aborted));
        }

        let speaker = self.participant(slot).config.clone();
        self.emit(DialogueEvent::TurnStarted {
            ordinal,
            speaker: speaker.name.clone(),
        });

        let prompt = if ordinal == 0 {
            self.prompts
                .opening(&speaker.name, &self.agent(slot.other()).name)
        } else {
            self.prompts.response(&speaker.name, &self.transcript)
        };
        log::debug!(
            "Turn {ordinal}: {} via {} ({} prompt chars)",
            speaker.name,
            speaker.provider,
            prompt.chars().count()
        );

        let call = self
            .participant(slot)
            .client
            .generate_poetry(&prompt, self.settings.turn_max_tokens);
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DialogueFailure::Aborted),
            result = call => result.map_err(DialogueFailure::Call),
        };
        let text = match result {
            Ok(text) => text,
            Err(kind) => return Err(self.fail_turn(ordinal, kind)),
        };

        self.transcript.append(Turn {
            ordinal,
            slot,
            speaker: speaker.clone(),
            text: text.clone(),
            form: self.plan.form.clone(),
        });
        self.emit(DialogueEvent::TurnCompleted {
            ordinal,
            speaker: speaker.name,
            text,
        });

        self.state = self
            .state
            .after_turn(self.transcript.len(), self.plan.total_turns());
        if self.state == DialogueState::Complete {
            log::info!("Dialogue complete after {} turns", self.transcript.len());
            self.emit(DialogueEvent::Completed {
                turns: self.transcript.len(),
            });
        }

        match self.transcript.last() {
            Some(turn) => Ok(turn),
            None => Err(self.failure(DialogueFailure::InvalidState("empty"))),
        }
    }

    /// Runs the whole dialogue from `Idle` to `Complete`.
    pub async fn run(mut self) -> Result<DialogueOutcome, DialogueError> {
        self.start().await?;
        while self.state != DialogueState::Complete {
            self.step().await?;
        }
        Ok(DialogueOutcome {
            title: self.title,
            transcript: self.transcript,
        })
    }

    fn fail_turn(&self, ordinal: usize, kind: DialogueFailure) -> DialogueError {
        log::warn!("Dialogue stopped at turn {ordinal}: {kind}");
        self.emit(DialogueEvent::Failed {
            ordinal,
            message: kind.to_string(),
        });
        DialogueError {
            ordinal,
            transcript: self.transcript.clone(),
            kind,
        }
    }

    fn failure(&self, kind: DialogueFailure) -> DialogueError {
        DialogueError {
            ordinal: self.transcript.len(),
            transcript: self.transcript.clone(),
            kind,
        }
    }

    fn emit(&self, event: DialogueEvent) {
        if let Some(sender) = &self.event_sender {
            let _ = sender.send(event);
        }
    }
}

impl std::fmt::Debug for DialogueOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogueOrchestrator")
            .field("state", &self.state)
            .field("rounds", &self.plan.rounds)
            .field("turns", &self.transcript.len())
            .finish()
    }
}

/// First non-empty line, without surrounding quotes or markdown emphasis.
fn clean_title(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let line = line.trim_start_matches('#').trim();
    let title = line
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '*' | '_' | '`' | '“' | '”'))
        .trim();
    let title = title.strip_prefix("Title:").map(str::trim).unwrap_or(title);
    (!title.is_empty()).then(|| title.to_string())
}
