use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tracing::info;

use boardbot_agent::reasoner::ReasonerError;
use boardbot_agent::{board_tools, AgentRuntime, ChatCompletionsReasoner};
use boardbot_core::config::{AppConfig, ConfigError};
use boardbot_core::session::SessionStore;
use boardbot_slack::{HttpNotifier, ResponseCoordinator};
use boardbot_trello::client::ApiError;
use boardbot_trello::{BoardIntents, TrelloClient};

use crate::{health, webhook};

pub struct Application {
    pub config: AppConfig,
    pub router: Router,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("board service client setup failed: {0}")]
    Trello(#[from] ApiError),
    #[error("slack notifier setup failed: {0}")]
    Notifier(#[source] reqwest::Error),
    #[error("reasoner setup failed: {0}")]
    Reasoner(#[from] ReasonerError),
}

/// Wires every collaborator from an already-validated config.
pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let board_api = Arc::new(TrelloClient::new(&config.trello)?);
    let intents = Arc::new(BoardIntents::new(board_api, config.trello.board_id.clone()));

    let notifier = Arc::new(HttpNotifier::new(&config.slack).map_err(BootstrapError::Notifier)?);
    let coordinator = Arc::new(ResponseCoordinator::new(notifier));

    let sessions =
        Arc::new(SessionStore::new(Duration::from_secs(config.agent.session_ttl_secs)));
    let tools = Arc::new(board_tools(intents, sessions.clone()));
    let reasoner = Arc::new(ChatCompletionsReasoner::new(&config.llm, &tools.specs())?);

    let runtime = Arc::new(AgentRuntime::new(
        reasoner,
        tools.clone(),
        sessions.clone(),
        coordinator,
        config.agent.max_cycles,
    ));

    let router = webhook::router(webhook::WebhookState {
        runtime,
        sessions,
        signing_secret: config.slack.signing_secret.clone(),
    })
    .merge(health::router());

    info!(
        event_name = "system.bootstrap.ready",
        tool_count = tools.len(),
        max_cycles = config.agent.max_cycles,
        "application bootstrap completed"
    );

    Ok(Application { config, router })
}

#[cfg(test)]
mod tests {
    use boardbot_core::config::{AppConfig, ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap_with_config;

    fn valid_config() -> AppConfig {
        AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                trello_api_key: Some("key-test".to_string()),
                trello_token: Some("token-test".to_string()),
                trello_board_id: Some("board-test".to_string()),
                slack_bot_token: Some("xoxb-test".to_string()),
                slack_signing_secret: Some("secret-test".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("valid test overrides")
    }

    #[test]
    fn bootstrap_succeeds_with_a_validated_config() {
        let app = bootstrap_with_config(valid_config()).expect("bootstrap");
        assert_eq!(app.config.agent.max_cycles, 25);
    }
}
