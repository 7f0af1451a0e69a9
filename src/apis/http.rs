//! HTTP backend for the game-room API, built on `reqwest`.
//!
//! This module provides [`HttpGameApi`], a [`GameApi`] implementation that
//! talks JSON over HTTP(S) to a game server. TLS is provided by `rustls`.
//!
//! # Feature gate
//!
//! Only available when the `api-http` feature is enabled (it is enabled by
//! default).
//!
//! # Example
//!
//! ```rust,no_run
//! # fn example() -> Result<(), trivia_room_client::TriviaError> {
//! use trivia_room_client::HttpGameApi;
//!
//! let api = HttpGameApi::new("https://example.org/api")?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::api::GameApi;
use crate::error::{Result, TriviaError};
use crate::protocol::{
    AnswerBody, CreateGameBody, FinishedPlayers, Game, GameEntry, GameId, GameResults, GuestBody,
    JoinGuestBody, LeaveBody, Progress, QuestionId, RegisterFinishedBody, StartGuestBody,
};

/// Per-request timeout. Polling cadences are sub-second, so a request that
/// takes longer than this is better abandoned and retried on a later tick.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A [`GameApi`] implementation backed by an HTTP JSON API.
#[derive(Debug, Clone)]
pub struct HttpGameApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGameApi {
    /// Create a backend rooted at `base_url` (with or without a trailing
    /// slash). The game routes are appended under `{base_url}/bible-games`.
    ///
    /// # Errors
    ///
    /// Returns [`TriviaError::Http`] if the underlying HTTP client cannot be
    /// constructed (TLS backend initialization failure).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(Self::map_err)?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create a backend from an existing `reqwest::Client`, for callers that
    /// need custom TLS, proxies, or headers.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/bible-games{}", self.base_url, path)
    }

    fn map_err(e: reqwest::Error) -> TriviaError {
        if e.is_timeout() {
            TriviaError::Timeout
        } else {
            TriviaError::Http(e.to_string())
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = match response.text().await {
            Ok(body) if !body.trim().is_empty() => body.trim().to_string(),
            _ => status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
        };
        Err(TriviaError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(Self::map_err)?;
        Self::check(response)
            .await?
            .json::<T>()
            .await
            .map_err(Self::map_err)
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(Self::map_err)?;
        Self::check(response).await
    }

    async fn post_unit<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<()> {
        self.post(path, body).await.map(|_| ())
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.post(path, body)
            .await?
            .json::<T>()
            .await
            .map_err(Self::map_err)
    }
}

#[async_trait]
impl GameApi for HttpGameApi {
    async fn create_game(&self, body: CreateGameBody) -> Result<GameEntry> {
        self.post_json("/create", &body).await
    }

    async fn list_waiting_games(&self) -> Result<Vec<Game>> {
        self.get("?status=waiting").await
    }

    async fn fetch_game(&self, id: GameId) -> Result<Game> {
        self.get(&format!("/{id}")).await
    }

    async fn join_guest(&self, id: GameId, body: JoinGuestBody) -> Result<GameEntry> {
        self.post_json(&format!("/{id}/join-guest"), &body).await
    }

    async fn start_guest(&self, id: GameId, body: StartGuestBody) -> Result<()> {
        self.post_unit(&format!("/{id}/start-guest"), &body).await
    }

    async fn fetch_progress(&self, id: GameId) -> Result<Progress> {
        self.get(&format!("/{id}/progress")).await
    }

    async fn submit_answer(
        &self,
        id: GameId,
        question: QuestionId,
        body: AnswerBody,
    ) -> Result<()> {
        self.post_unit(&format!("/{id}/questions/{question}/answer-guest"), &body)
            .await
    }

    async fn set_finished(&self, id: GameId, body: GuestBody) -> Result<()> {
        self.post_unit(&format!("/{id}/set-finished"), &body).await
    }

    async fn register_finished(&self, id: GameId, body: RegisterFinishedBody) -> Result<()> {
        self.post_unit(&format!("/{id}/register-finished"), &body)
            .await
    }

    async fn finished_players(&self, id: GameId) -> Result<FinishedPlayers> {
        self.get(&format!("/{id}/finished-players")).await
    }

    async fn force_complete(&self, id: GameId, body: GuestBody) -> Result<()> {
        self.post_unit(&format!("/{id}/force-complete"), &body)
            .await
    }

    async fn fetch_results(&self, id: GameId) -> Result<GameResults> {
        self.get(&format!("/{id}/results")).await
    }

    async fn leave(&self, id: GameId, body: LeaveBody) -> Result<()> {
        self.post_unit(&format!("/{id}/leave"), &body).await
    }

    async fn cleanup_expired(&self) -> Result<()> {
        self.post_unit("/cleanup-expired", &()).await
    }
}

#[cfg(test)]
#[cfg(feature = "api-http")]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn http_api_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HttpGameApi>();
    }

    #[test]
    fn trailing_slashes_are_stripped() {
        let api = HttpGameApi::with_client(reqwest::Client::new(), "http://localhost:4000//");
        assert_eq!(
            api.url("/7/progress"),
            "http://localhost:4000/bible-games/7/progress"
        );
    }

    #[test]
    fn list_route_uses_the_status_query() {
        let api = HttpGameApi::with_client(reqwest::Client::new(), "http://localhost:4000");
        assert_eq!(
            api.url("?status=waiting"),
            "http://localhost:4000/bible-games?status=waiting"
        );
    }

    #[tokio::test]
    async fn unreachable_host_maps_to_http_error() {
        let api = HttpGameApi::new("http://127.0.0.1:1").unwrap();
        let err = api.fetch_game(1).await.unwrap_err();
        assert!(matches!(err, TriviaError::Http(_)));
    }
}
