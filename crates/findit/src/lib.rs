//! Claim-resolution workflow for lost and found reports.
//!
//! Items collect responses from other users; the item owner accepts exactly one of them,
//! which resolves the item, rejects the competing claims and unlocks a private chat
//! channel between the owner and the accepted responder.

pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod memory;
pub mod notifications;
pub mod telemetry;
pub mod workflows;
