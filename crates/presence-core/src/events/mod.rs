//! Subscription lifecycle events emitted by the protocol engine

mod subscription_event;

pub use subscription_event::SubscriptionEvent;
