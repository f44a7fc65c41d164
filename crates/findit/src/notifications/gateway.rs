use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::message::{Envelope, NotificationKind, NotificationPayload};
use crate::workflows::claims::domain::UserId;

/// Outcome of a single notification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub delivered: bool,
    pub detail: String,
}

/// Entry point the workflow calls. Never fails: problems are folded into the report.
pub trait NotificationGateway: Send + Sync {
    fn notify(
        &self,
        kind: NotificationKind,
        recipient: &UserId,
        payload: &NotificationPayload,
    ) -> DeliveryReport;
}

/// Moves a rendered envelope to its destination (mail relay, outbox table, log).
pub trait NotificationTransport: Send + Sync {
    /// Returns a transport-specific receipt on success.
    fn deliver(&self, envelope: &Envelope) -> Result<String, DeliveryError>;
}

/// Notification dispatch error. Confined to the gateway boundary.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Gateway rendering notifications and handing them to a transport.
pub struct DispatchGateway<T> {
    transport: Arc<T>,
    sender: String,
}

impl<T> DispatchGateway<T>
where
    T: NotificationTransport + 'static,
{
    pub fn new(transport: Arc<T>, sender: impl Into<String>) -> Self {
        Self {
            transport,
            sender: sender.into(),
        }
    }
}

impl<T> NotificationGateway for DispatchGateway<T>
where
    T: NotificationTransport + 'static,
{
    fn notify(
        &self,
        kind: NotificationKind,
        recipient: &UserId,
        payload: &NotificationPayload,
    ) -> DeliveryReport {
        let envelope = Envelope::render(kind, &self.sender, recipient, payload);
        match self.transport.deliver(&envelope) {
            Ok(receipt) => {
                info!(
                    kind = kind.label(),
                    recipient = %recipient.0,
                    item_id = %payload.item.id.0,
                    receipt = %receipt,
                    "notification delivered"
                );
                DeliveryReport {
                    delivered: true,
                    detail: receipt,
                }
            }
            Err(err) => {
                warn!(
                    kind = kind.label(),
                    recipient = %recipient.0,
                    item_id = %payload.item.id.0,
                    error = %err,
                    "notification delivery failed"
                );
                DeliveryReport {
                    delivered: false,
                    detail: err.to_string(),
                }
            }
        }
    }
}

/// Transport used while outbound delivery is switched off: records the intent in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTransport;

impl NotificationTransport for LogTransport {
    fn deliver(&self, envelope: &Envelope) -> Result<String, DeliveryError> {
        info!(
            kind = envelope.kind.label(),
            recipient = %envelope.recipient.0,
            subject = %envelope.subject,
            "notification delivery disabled, logged only"
        );
        Ok("notifications disabled".to_string())
    }
}
