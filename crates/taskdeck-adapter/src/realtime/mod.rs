/*
[INPUT]:  Backend base URL, API key and session token
[OUTPUT]: Live row-change subscriptions over a websocket
[POS]:    Realtime layer - live change feed
[UPDATE]: When adding channel kinds or changing connection logic
*/

pub mod client;
pub mod message;

pub use client::{LiveSubscription, RealtimeClient, RealtimeConfig};
pub use message::{Inbound, PhoenixMessage};
