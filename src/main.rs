//! SkillUp Plus 2030+ - career mentoring companion
//!
//! Sign in, browse learning trails and talk to an AI mentor about the skills
//! that matter for the next decade, from the terminal.

mod app;
mod config;
mod conversation;
mod identity;
mod llm;
mod runtime;
mod shell;
mod state_machine;
mod trails;


use app::App;
use config::AppConfig;
use runtime::{ConsoleNotifier, Notifier};
use shell::Shell;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout belongs to the terminal UI
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "skillup_plus=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("SKILLUP_LOG_JSON").is_ok_and(|v| v == "1") {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let config = AppConfig::from_env()?;
    let app = App::init(&config)?;
    tracing::info!(
        model = %config.gemini.model,
        persona_delivery = ?config.gemini.persona_delivery,
        "SkillUp Plus starting"
    );

    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier::stdout());
    let shell = Shell::new(
        app,
        BufReader::new(tokio::io::stdin()),
        std::io::stdout(),
        notifier,
    );

    let (app, result) = shell.run().await;
    app.shutdown().await;
    result?;

    Ok(())
}
