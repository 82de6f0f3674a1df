//! Token lifecycle — serve stored access tokens, refresh them lazily near
//! expiry, and report every outcome to an event sink.

pub mod events;
pub mod manager;

pub use events::{TokenEvent, TokenEventSink, TracingEventSink};
pub use manager::TokenLifecycleManager;
