//! Asynchronous notification dispatcher
//!
//! Events are queued onto an unbounded channel and drained by a background
//! worker. With a webhook URL configured the worker POSTs each event to the
//! downstream notification service; without one it just logs them.

use anyhow::Context;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Human-readable event kinds delivered to users
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type")]
pub enum NotificationEvent {
    RequestCreated { request_id: Uuid },
    MessagePosted { request_id: Uuid, message_id: Uuid },
    NegotiationAccepted { request_id: Uuid },
    PurchaseAwaitingApproval { slot_id: Uuid },
    SlotApproved { slot_id: Uuid },
    SlotRejected { slot_id: Uuid, reason: String },
    RankConfirmed { slot_id: Uuid, guarantee_met: bool },
    SlotCompleted { slot_id: Uuid },
    RefundConfirmationRequired { slot_id: Uuid, refund_request_id: Uuid },
    RefundApprovalRequested { slot_id: Uuid, refund_request_id: Uuid },
    RefundApproved { slot_id: Uuid, refund_request_id: Uuid },
    RefundRejected { slot_id: Uuid, refund_request_id: Uuid },
}

/// One queued delivery
#[derive(Debug, Serialize, Clone)]
pub struct Notification {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub event: NotificationEvent,
}

/// Handle for enqueueing notifications
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
    /// Spawn the dispatcher worker and return the enqueue handle.
    pub fn spawn(webhook_url: Option<String>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();

        tokio::spawn(async move {
            let client = reqwest::Client::new();
            while let Some(notification) = rx.recv().await {
                match &webhook_url {
                    Some(url) => {
                        if let Err(e) = deliver(&client, url, &notification).await {
                            tracing::warn!(
                                user_id = %notification.user_id,
                                error = %e,
                                "Failed to deliver notification"
                            );
                        } else {
                            tracing::debug!(
                                user_id = %notification.user_id,
                                "Notification delivered"
                            );
                        }
                    }
                    None => {
                        tracing::info!(
                            user_id = %notification.user_id,
                            event = ?notification.event,
                            "Notification (no webhook configured)"
                        );
                    }
                }
            }
        });

        Self { tx }
    }

    /// Enqueue a notification. Never fails the caller.
    pub fn notify(&self, user_id: Uuid, event: NotificationEvent) {
        let notification = Notification { user_id, event };
        if let Err(e) = self.tx.send(notification) {
            tracing::error!("Notification dispatcher is gone: {}", e);
        }
    }
}

async fn deliver(
    client: &reqwest::Client,
    url: &str,
    notification: &Notification,
) -> anyhow::Result<()> {
    let response = client
        .post(url)
        .json(notification)
        .send()
        .await
        .context("notification request failed")?;

    if !response.status().is_success() {
        anyhow::bail!("notification endpoint returned {}", response.status());
    }

    Ok(())
}
