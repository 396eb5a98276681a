//! PostgREST-flavored HTTP client for the remote puzzle store

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::{AccessTier, PuzzleId, PuzzleRevision, RemoteAttempt, RemotePuzzle};

use super::RemoteStore;

const PUZZLE_COLUMNS: &str = "id,game_mode,puzzle_date,content,difficulty,updated_at";

/// Public endpoint/key configuration for the remote store.
///
/// These are safe-to-ship values; the per-user bearer token is supplied
/// separately by the caller's auth layer when a client is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: String,
}

impl RemoteConfig {
    /// Create a new remote store configuration
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

/// HTTP implementation of [`RemoteStore`]
///
/// Built per user session: the bearer token carries the identity the server
/// uses for row visibility and for attempt ownership.
#[derive(Clone)]
pub struct RestRemoteStore {
    base_url: String,
    api_key: String,
    access_token: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for RestRemoteStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RestRemoteStore")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("access_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl RestRemoteStore {
    /// Build a client for one user session
    pub fn new(config: &RemoteConfig, access_token: impl Into<String>) -> Result<Self> {
        let base_url = normalize_base_url(&config.base_url)?;

        let api_key = config.api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(Error::InvalidInput("API key must not be empty".to_string()));
        }

        let access_token = access_token.into().trim().to_string();
        if access_token.is_empty() {
            return Err(Error::InvalidInput(
                "access token must not be empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|error| Error::RemoteUnavailable(sanitize(&error)))?;

        Ok(Self {
            base_url,
            api_key,
            access_token,
            client,
        })
    }

    fn get(&self, url: String) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
    }

    fn rpc(&self, name: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/rest/v1/rpc/{name}", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
    }

    async fn get_puzzles(&self, filters: &[String]) -> Result<Vec<RemotePuzzle>> {
        let mut url = format!("{}/rest/v1/puzzles?select={PUZZLE_COLUMNS}", self.base_url);
        for filter in filters {
            url.push('&');
            url.push_str(filter);
        }

        let response = self
            .get(url)
            .send()
            .await
            .map_err(|error| Error::RemoteUnavailable(sanitize(&error)))?;
        let response = check_status(response).await?;

        response
            .json::<Vec<RemotePuzzle>>()
            .await
            .map_err(|error| Error::RemoteRejected(format!("invalid payload: {}", sanitize(&error))))
    }
}

#[async_trait]
impl RemoteStore for RestRemoteStore {
    async fn fetch_visible_puzzles(&self, tier: AccessTier) -> Result<Vec<RemotePuzzle>> {
        let mut filters = vec!["order=puzzle_date.asc".to_string()];
        if let Some(filter) = tier_filter(tier) {
            filters.push(filter);
        }
        self.get_puzzles(&filters).await
    }

    async fn fetch_revisions_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        tier: AccessTier,
    ) -> Result<Vec<PuzzleRevision>> {
        let mut url = format!(
            "{}/rest/v1/puzzles?select=id,updated_at&{}",
            self.base_url,
            date_filter(start, end)
        );
        if let Some(filter) = tier_filter(tier) {
            url.push('&');
            url.push_str(&filter);
        }

        let response = self
            .get(url)
            .send()
            .await
            .map_err(|error| Error::RemoteUnavailable(sanitize(&error)))?;
        let response = check_status(response).await?;

        response
            .json::<Vec<PuzzleRevision>>()
            .await
            .map_err(|error| Error::RemoteRejected(format!("invalid payload: {}", sanitize(&error))))
    }

    async fn fetch_puzzles_by_ids(&self, ids: &[PuzzleId]) -> Result<Vec<RemotePuzzle>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.get_puzzles(&[id_list_filter(ids)]).await
    }

    async fn fetch_puzzle_by_id(&self, id: &PuzzleId) -> Result<Option<RemotePuzzle>> {
        let response = self
            .rpc("fetch_puzzle_by_id")
            .json(&serde_json::json!({ "puzzle_id": id }))
            .send()
            .await
            .map_err(|error| Error::RemoteUnavailable(sanitize(&error)))?;
        let response = check_status(response).await?;

        let mut puzzles = response
            .json::<Vec<RemotePuzzle>>()
            .await
            .map_err(|error| Error::RemoteRejected(format!("invalid payload: {}", sanitize(&error))))?;

        Ok(if puzzles.is_empty() {
            None
        } else {
            Some(puzzles.swap_remove(0))
        })
    }

    async fn upsert_attempt(&self, attempt: &RemoteAttempt) -> Result<()> {
        let response = self
            .rpc("upsert_attempt")
            .json(attempt)
            .send()
            .await
            .map_err(|error| Error::RemoteUnavailable(sanitize(&error)))?;
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(Error::RemoteRejected(parse_api_error(status, &body)))
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", compact_body(trimmed), status.as_u16())
    }
}

fn tier_filter(tier: AccessTier) -> Option<String> {
    // Premium sees the whole catalog; the free tier only its own slice
    match tier {
        AccessTier::Free => Some(format!("tier=eq.{}", AccessTier::Free.as_str())),
        AccessTier::Premium => None,
    }
}

fn date_filter(start: NaiveDate, end: NaiveDate) -> String {
    format!("puzzle_date=gte.{start}&puzzle_date=lte.{end}")
}

fn id_list_filter(ids: &[PuzzleId]) -> String {
    let list = ids
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("id=in.({list})")
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(
            "base URL must not be empty".to_string(),
        ));
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "base URL must include http:// or https://".to_string(),
        ))
    }
}

fn sanitize(error: &impl std::fmt::Display) -> String {
    error.to_string().replace('\n', " ").trim().to_string()
}

fn compact_body(body: &str) -> String {
    body.chars().take(180).collect()
}
