//! Ranking-check collaborator trigger
//!
//! The ranking service itself lives elsewhere; on slot approval the engine
//! asks it once to start tracking the keyword. The call is spawned off the
//! request path and its outcome only ever reaches the logs.

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
struct RankCheckRequest {
    slot_id: Uuid,
    keyword_id: Option<Uuid>,
    target_rank: i32,
}

/// Fire-and-forget client for the ranking-check service
#[derive(Clone)]
pub struct RankChecker {
    client: reqwest::Client,
    url: Option<String>,
}

impl RankChecker {
    pub fn new(url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    /// Ask the ranking service to start checking a slot's keyword.
    pub fn trigger(&self, slot_id: Uuid, keyword_id: Option<Uuid>, target_rank: i32) {
        let Some(url) = self.url.clone() else {
            tracing::info!(%slot_id, "Rank check trigger skipped (no RANK_CHECK_URL configured)");
            return;
        };

        let client = self.client.clone();
        tokio::spawn(async move {
            let body = RankCheckRequest {
                slot_id,
                keyword_id,
                target_rank,
            };
            match client.post(&url).json(&body).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(%slot_id, "Rank check triggered");
                }
                Ok(response) => {
                    tracing::warn!(
                        %slot_id,
                        status = %response.status(),
                        "Rank check service returned an error"
                    );
                }
                Err(e) => {
                    tracing::warn!(%slot_id, error = %e, "Failed to trigger rank check");
                }
            }
        });
    }
}
