use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use poetry_duet::config::{load_config, secure_file_permissions, AppConfig, SessionConfig};
use poetry_duet::dialogue::DialogueEvent;
use poetry_duet::registry::{Credentials, ProviderRegistry};
use poetry_duet::{ProviderIdentity, RoutingMode, SessionRunner, Vendor};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::args::{CliArgs, Command};
use crate::logging::init_logging;

pub async fn run() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let loaded = load_config(args.config.clone())?;
    let _logger = init_logging(&loaded.config.logging, &loaded.paths)?;

    let credentials = Credentials::from_file_and_env(&loaded.paths.secrets_file)
        .with_context(|| format!("reading {}", loaded.paths.secrets_file.display()))?;
    secure_file_permissions(&loaded.paths.secrets_file)?;
    let registry = Arc::new(loaded.config.registry_builder(credentials)?.build());

    let routing = args.command.routing();
    match args.command {
        Command::Run {
            session,
            output,
            quiet,
        } => run_session(registry, loaded.config, &session, output.as_deref(), quiet).await,
        Command::Models {
            provider, search, ..
        } => list_models(&registry, identity(&provider, routing)?, search.as_deref()).await,
        Command::Check {
            provider, model, ..
        } => check_model(&registry, identity(&provider, routing)?, &model).await,
    }
}

fn identity(provider: &str, routing: RoutingMode) -> anyhow::Result<ProviderIdentity> {
    let vendor: Vendor = provider.parse()?;
    Ok(ProviderIdentity::new(vendor, routing))
}

async fn run_session(
    registry: Arc<ProviderRegistry>,
    config: AppConfig,
    session_path: &Path,
    output: Option<&Path>,
    quiet: bool,
) -> anyhow::Result<()> {
    let session = SessionConfig::load(session_path)
        .with_context(|| format!("loading session {}", session_path.display()))?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, aborting session");
            on_interrupt.cancel();
        }
    });

    let mut runner = SessionRunner::new(registry, config).with_cancellation(cancel);
    let progress = if quiet {
        None
    } else {
        let (tx, rx) = mpsc::unbounded_channel();
        runner = runner.with_events(tx);
        Some(tokio::spawn(print_progress(rx)))
    };

    let result = runner.run(&session).await;
    drop(runner);
    if let Some(progress) = progress {
        let _ = progress.await;
    }
    let result = result?;

    let json = serde_json::to_string_pretty(&result)?;
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn print_progress(mut rx: mpsc::UnboundedReceiver<DialogueEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            DialogueEvent::Started { theme, total_turns } => {
                eprintln!("Dialogue on \"{theme}\": {total_turns} turns")
            }
            DialogueEvent::TitleGenerated { title } => eprintln!("Title: {title}"),
            DialogueEvent::TurnStarted { ordinal, speaker } => {
                eprintln!("[{}] {speaker} is writing...", ordinal + 1)
            }
            DialogueEvent::TurnCompleted { .. } => {}
            DialogueEvent::Completed { turns } => eprintln!("Dialogue complete ({turns} turns)"),
            DialogueEvent::Failed { ordinal, message } => {
                eprintln!("Turn {} failed: {message}", ordinal + 1)
            }
        }
    }
}

async fn list_models(
    registry: &ProviderRegistry,
    identity: ProviderIdentity,
    search: Option<&str>,
) -> anyhow::Result<()> {
    let catalog = registry.catalog(identity).await?;
    if !catalog.is_live() {
        eprintln!("{identity}: live listing unavailable, showing built-in models");
    }
    let default = registry.default_model(identity);
    let models: Vec<_> = match search {
        Some(term) => catalog.search(term),
        None => catalog.iter().collect(),
    };
    for model in models {
        let marker = if default.as_deref() == Some(model.model_id.as_str()) {
            " (default)"
        } else {
            ""
        };
        println!("{}\t{}{marker}", model.display_name, model.model_id);
    }
    Ok(())
}

async fn check_model(
    registry: &ProviderRegistry,
    identity: ProviderIdentity,
    model: &str,
) -> anyhow::Result<()> {
    let descriptor = registry.select_model(identity, Some(model)).await?;
    let client = registry.resolve(identity)?.bind(descriptor)?;
    if client.test_connection().await {
        println!("{identity} {}: ok", client.model().model_id);
        Ok(())
    } else {
        anyhow::bail!("{identity} {}: no answer", client.model().model_id)
    }
}
