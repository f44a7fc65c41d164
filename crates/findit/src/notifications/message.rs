use serde::Serialize;

use crate::workflows::claims::domain::{Item, UserId};

/// Events the workflow announces to the parties involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A response was submitted against an item; sent to the item owner.
    ClaimSubmitted,
    /// The owner accepted a response; sent to the responder.
    MatchAccepted,
}

impl NotificationKind {
    pub const fn label(self) -> &'static str {
        match self {
            NotificationKind::ClaimSubmitted => "claim_submitted",
            NotificationKind::MatchAccepted => "match_accepted",
        }
    }
}

/// What the notification is about. Rendering decides how it reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub item: Item,
    pub owner: UserId,
    pub responder: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub claiming_match: bool,
}

/// Rendered notification handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope {
    pub kind: NotificationKind,
    pub from: String,
    pub recipient: UserId,
    pub subject: String,
    pub body: String,
}

impl Envelope {
    pub fn render(
        kind: NotificationKind,
        from: &str,
        recipient: &UserId,
        payload: &NotificationPayload,
    ) -> Self {
        let item = &payload.item;
        let category = item.category.label();

        let (subject, body) = match kind {
            NotificationKind::ClaimSubmitted => {
                let (subject, verb, noun) = if payload.claiming_match {
                    (
                        format!("Someone claimed a match for your {category} item: {}", item.name),
                        "claimed a match",
                        "claim",
                    )
                } else {
                    (
                        format!("New response on your {category} item: {}", item.name),
                        "responded",
                        "response",
                    )
                };
                let message = payload.message.as_deref().unwrap_or_default();
                let body = format!(
                    "Hi {owner},\n\n{responder} has {verb} to your {category} item \"{name}\".\n\n\
                     Message: \"{message}\"\n\nItem location: {location}\n\n\
                     Log in to FindIt to review this {noun}.",
                    owner = payload.owner.0,
                    responder = payload.responder.0,
                    name = item.name,
                    location = item.location,
                );
                (subject, body)
            }
            NotificationKind::MatchAccepted => {
                let subject = format!("Your claim on {} was accepted", item.name);
                let body = format!(
                    "Hi {responder},\n\n{owner} accepted your response on the {category} item \
                     \"{name}\", which is now {status}.\n\n\
                     A private chat with {owner} is open in FindIt so you can arrange the handover.",
                    responder = payload.responder.0,
                    owner = payload.owner.0,
                    name = item.name,
                    status = item.status.label(),
                );
                (subject, body)
            }
        };

        Self {
            kind,
            from: from.to_string(),
            recipient: recipient.clone(),
            subject,
            body,
        }
    }
}
