//! HTTP client for the remote store of record.

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::{GameEventEntity, GameRecord, QuarterScoreEntity};

/// Result alias for remote delivery attempts.
pub type SyncResult<T> = Result<T, SyncError>;

/// Error raised by a single remote delivery attempt.
///
/// Delivery is best-effort: the outbox counts these against the retry cap
/// and never surfaces them as blocking errors.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The request could not be sent (offline, DNS, TLS).
    #[error("request to `{path}` failed: {source}")]
    Request {
        /// Endpoint path of the attempt.
        path: String,
        #[source]
        /// Underlying transport failure.
        source: reqwest::Error,
    },
    /// The backend answered with a non-success status.
    #[error("`{path}` returned status {status}")]
    Status {
        /// Endpoint path of the attempt.
        path: String,
        /// HTTP status returned.
        status: StatusCode,
    },
    /// The backend answered success but the body could not be decoded.
    #[error("failed to decode response from `{path}`: {source}")]
    Decode {
        /// Endpoint path of the attempt.
        path: String,
        #[source]
        /// Underlying decode failure.
        source: reqwest::Error,
    },
}

/// Remote backend endpoints consumed by the sync outbox.
///
/// The backend is expected to be idempotent or tolerant of duplicate
/// submission: delivery is at-least-once under retried-then-succeeded races.
pub trait RemoteApi: Send + Sync {
    /// `POST /games` — create the game record, returning its identifier.
    fn create_game(&self, game: GameRecord) -> BoxFuture<'static, SyncResult<String>>;
    /// `POST /games/{id}/quarters` — append one closed-quarter record.
    fn append_quarter(
        &self,
        game_id: Uuid,
        quarter: QuarterScoreEntity,
    ) -> BoxFuture<'static, SyncResult<()>>;
    /// `POST /games/{id}/events` — append one recorded event.
    fn append_event(
        &self,
        game_id: Uuid,
        event: GameEventEntity,
    ) -> BoxFuture<'static, SyncResult<()>>;
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: String,
}

/// [`RemoteApi`] implementation over HTTP with JSON bodies.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
}

impl HttpRemote {
    /// Build a client for the backend at `base_url` (no trailing slash needed).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
        }
    }

    async fn post<B>(&self, path: String, body: &B) -> SyncResult<reqwest::Response>
    where
        B: serde::Serialize,
    {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| SyncError::Request { path: path.clone(), source })?;
        if !response.status().is_success() {
            return Err(SyncError::Status {
                path,
                status: response.status(),
            });
        }
        Ok(response)
    }
}

impl RemoteApi for HttpRemote {
    fn create_game(&self, game: GameRecord) -> BoxFuture<'static, SyncResult<String>> {
        let remote = self.clone();
        Box::pin(async move {
            let path = "games".to_string();
            let response = remote.post(path.clone(), &game).await?;
            let created = response
                .json::<CreatedResponse>()
                .await
                .map_err(|source| SyncError::Decode { path, source })?;
            Ok(created.id)
        })
    }

    fn append_quarter(
        &self,
        game_id: Uuid,
        quarter: QuarterScoreEntity,
    ) -> BoxFuture<'static, SyncResult<()>> {
        let remote = self.clone();
        Box::pin(async move {
            remote
                .post(format!("games/{game_id}/quarters"), &quarter)
                .await?;
            Ok(())
        })
    }

    fn append_event(
        &self,
        game_id: Uuid,
        event: GameEventEntity,
    ) -> BoxFuture<'static, SyncResult<()>> {
        let remote = self.clone();
        Box::pin(async move {
            remote.post(format!("games/{game_id}/events"), &event).await?;
            Ok(())
        })
    }
}
