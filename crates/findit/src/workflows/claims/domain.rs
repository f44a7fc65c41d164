use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Caller identity as supplied by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Identifier wrapper for reported items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub String);

/// Identifier wrapper for responses. Also keys the chat channel of an accepted response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResponseId(pub String);

/// Whether the reporter lost the item or found it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemCategory {
    Lost,
    Found,
}

impl ItemCategory {
    pub const fn label(self) -> &'static str {
        match self {
            ItemCategory::Lost => "lost",
            ItemCategory::Found => "found",
        }
    }
}

/// Informational classification of the object itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemClass {
    Electronics,
    Clothing,
    Accessories,
    Documents,
    Keys,
    Bags,
    Others,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    Open,
    Resolved,
}

impl ItemStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ItemStatus::Open => "open",
            ItemStatus::Resolved => "resolved",
        }
    }

    pub const fn is_open(self) -> bool {
        matches!(self, ItemStatus::Open)
    }
}

/// Fields captured when an item is reported. The owner comes from the caller identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReport {
    pub name: String,
    pub description: String,
    pub category: ItemCategory,
    pub item_class: ItemClass,
    pub location: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub images: Vec<String>,
}

/// A reported lost or found object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub owner: UserId,
    pub name: String,
    pub description: String,
    pub category: ItemCategory,
    pub item_class: ItemClass,
    pub location: String,
    pub date: NaiveDate,
    pub images: Vec<String>,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.owner == user
    }
}

/// Lifecycle of a response. Accepted and Rejected are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ResponseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ResponseStatus::Pending => "pending",
            ResponseStatus::Accepted => "accepted",
            ResponseStatus::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, ResponseStatus::Accepted | ResponseStatus::Rejected)
    }

    /// Only Pending responses may move, and only into a terminal state.
    pub const fn can_transition_to(self, next: ResponseStatus) -> bool {
        matches!(
            (self, next),
            (ResponseStatus::Pending, ResponseStatus::Accepted)
                | (ResponseStatus::Pending, ResponseStatus::Rejected)
        )
    }
}

/// Claim or tip submitted against an item by another user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResponse {
    pub id: ResponseId,
    pub item_id: ItemId,
    pub responder: UserId,
    pub message: String,
    /// The responder asserts this is the same object, not just a sighting.
    pub claiming_match: bool,
    pub status: ResponseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set once the acceptance notification has been handed to the gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notified_at: Option<DateTime<Utc>>,
}

/// Payload accepted from responders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSubmission {
    pub message: String,
    #[serde(default)]
    pub claiming_match: bool,
}

/// Requested status change on a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: ResponseStatus,
}
