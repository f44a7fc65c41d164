//! Best-effort notifications raised by the claim workflow.
//!
//! The workflow decides that a notification is due and what it says; transports decide how it
//! travels. Delivery failures stop at the gateway and surface only as a [`DeliveryReport`].

mod gateway;
mod message;

pub use gateway::{
    DeliveryError, DeliveryReport, DispatchGateway, LogTransport, NotificationGateway,
    NotificationTransport,
};
pub use message::{Envelope, NotificationKind, NotificationPayload};
