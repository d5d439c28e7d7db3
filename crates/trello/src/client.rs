use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use boardbot_core::config::TrelloConfig;
use boardbot_core::ops::{BoardRef, CardRef};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("board service returned HTTP {status} for {operation}")]
    Status { status: u16, operation: &'static str },
    #[error("board service request failed for {operation}: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("board service client could not be constructed: {0}")]
    Build(#[source] reqwest::Error),
}

/// A list name/id pair on a board, in board order.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ListRef {
    pub name: String,
    pub id: String,
}

/// Full card detail as needed by the daily report path.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CardDetail {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    pub closed: bool,
    pub url: String,
    #[serde(rename = "dateLastActivity")]
    pub date_last_activity: DateTime<Utc>,
}

/// One method per board-service REST call. Stateless; implementations hold
/// credentials and an HTTP client but no conversation state.
#[async_trait]
pub trait BoardApi: Send + Sync {
    async fn list_boards(&self) -> Result<Vec<BoardRef>, ApiError>;
    async fn list_lists(&self, board_id: &str) -> Result<Vec<ListRef>, ApiError>;
    async fn list_cards(&self, list_id: &str) -> Result<Vec<CardRef>, ApiError>;
    /// Not idempotent: a duplicate call creates a duplicate card.
    async fn create_card(&self, list_id: &str, name: &str, desc: &str)
        -> Result<CardRef, ApiError>;
    async fn move_card(&self, card_id: &str, target_list_id: &str) -> Result<(), ApiError>;
    async fn update_card(
        &self,
        card_id: &str,
        name: Option<&str>,
        desc: Option<&str>,
    ) -> Result<(), ApiError>;
    async fn get_card(&self, card_id: &str) -> Result<CardDetail, ApiError>;
}

pub struct TrelloClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    token: SecretString,
}

impl TrelloClient {
    pub fn new(config: &TrelloConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ApiError::Build)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            token: config.token.clone(),
        })
    }

    fn auth_params(&self) -> [(&'static str, &str); 2] {
        [("key", self.api_key.expose_secret()), ("token", self.token.expose_secret())]
    }

    async fn get_json<T>(&self, path: &str, operation: &'static str) -> Result<T, ApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&self.auth_params())
            .send()
            .await
            .map_err(|source| ApiError::Transport { operation, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status { status: status.as_u16(), operation });
        }

        response.json::<T>().await.map_err(|source| ApiError::Transport { operation, source })
    }
}

#[async_trait]
impl BoardApi for TrelloClient {
    async fn list_boards(&self) -> Result<Vec<BoardRef>, ApiError> {
        self.get_json("/members/me/boards", "list_boards").await
    }

    async fn list_lists(&self, board_id: &str) -> Result<Vec<ListRef>, ApiError> {
        self.get_json(&format!("/boards/{board_id}/lists"), "list_lists").await
    }

    async fn list_cards(&self, list_id: &str) -> Result<Vec<CardRef>, ApiError> {
        self.get_json(&format!("/lists/{list_id}/cards"), "list_cards").await
    }

    async fn create_card(
        &self,
        list_id: &str,
        name: &str,
        desc: &str,
    ) -> Result<CardRef, ApiError> {
        let operation = "create_card";
        let url = format!("{}/cards", self.base_url);
        let response = self
            .http
            .post(&url)
            .query(&self.auth_params())
            .query(&[("idList", list_id), ("name", name), ("desc", desc), ("pos", "top")])
            .send()
            .await
            .map_err(|source| ApiError::Transport { operation, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status { status: status.as_u16(), operation });
        }

        response
            .json::<CardRef>()
            .await
            .map_err(|source| ApiError::Transport { operation, source })
    }

    async fn move_card(&self, card_id: &str, target_list_id: &str) -> Result<(), ApiError> {
        let operation = "move_card";
        let url = format!("{}/cards/{card_id}", self.base_url);
        let response = self
            .http
            .put(&url)
            .query(&self.auth_params())
            .query(&[("idList", target_list_id)])
            .send()
            .await
            .map_err(|source| ApiError::Transport { operation, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status { status: status.as_u16(), operation });
        }
        Ok(())
    }

    async fn update_card(
        &self,
        card_id: &str,
        name: Option<&str>,
        desc: Option<&str>,
    ) -> Result<(), ApiError> {
        let operation = "update_card";
        let url = format!("{}/cards/{card_id}", self.base_url);

        let mut request = self.http.put(&url).query(&self.auth_params());
        if let Some(name) = name {
            request = request.query(&[("name", name)]);
        }
        if let Some(desc) = desc {
            request = request.query(&[("desc", desc)]);
        }

        let response =
            request.send().await.map_err(|source| ApiError::Transport { operation, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status { status: status.as_u16(), operation });
        }
        Ok(())
    }

    async fn get_card(&self, card_id: &str) -> Result<CardDetail, ApiError> {
        self.get_json(&format!("/cards/{card_id}"), "get_card").await
    }
}
