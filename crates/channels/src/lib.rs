//! Messaging-channel edges: inbound webhook parsing and outbound reply
//! delivery for Meta's Messenger platform.

pub mod delivery;
pub mod events;

pub use delivery::{DeliveryError, GraphApiDelivery, MessageDelivery, NoopDelivery};
pub use events::{parse_webhook, EventParseError, InboundMessage, VerifyParams, WebhookPayload};
