//! Campaign catalog adapter
//!
//! The catalog itself is owned by another service; this engine reads
//! contract-terms bounds from it and never writes.

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// Service type marking a campaign as guarantee-contract capable.
pub const GUARANTEE_SERVICE_TYPE: &str = "rank_guarantee";

/// Campaign terms bounds, read-only for this engine
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Campaign {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub service_type: String,
    pub guarantee_unit: String,
    pub min_guarantee_price: i64,
    pub max_guarantee_price: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    pub fn is_guarantee_type(&self) -> bool {
        self.service_type == GUARANTEE_SERVICE_TYPE
    }
}

/// Read-only access to the campaign catalog
#[derive(Clone)]
pub struct CampaignService {
    db_pool: PgPool,
}

impl CampaignService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Fetch the terms for a campaign, requiring it to be an active
    /// guarantee-typed campaign.
    pub async fn get_terms(&self, campaign_id: Uuid) -> EngineResult<Campaign> {
        let campaign = sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1")
            .bind(campaign_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| {
                EngineError::InvalidCampaign(format!("campaign {} not found", campaign_id))
            })?;

        if !campaign.is_active {
            return Err(EngineError::InvalidCampaign(format!(
                "campaign {} is not active",
                campaign_id
            )));
        }

        if !campaign.is_guarantee_type() {
            return Err(EngineError::InvalidCampaign(format!(
                "campaign {} is not a guarantee campaign (service type '{}')",
                campaign_id, campaign.service_type
            )));
        }

        Ok(campaign)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(service_type: &str) -> Campaign {
        Campaign {
            id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            service_type: service_type.to_string(),
            guarantee_unit: "day".to_string(),
            min_guarantee_price: 1_000,
            max_guarantee_price: 100_000,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_guarantee_type() {
        assert!(sample(GUARANTEE_SERVICE_TYPE).is_guarantee_type());
        assert!(!sample("display_banner").is_guarantee_type());
    }
}
