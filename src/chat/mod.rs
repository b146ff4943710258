//! Travel recommendation chat: prompt construction and the model gateway.

mod gateway;
pub mod prompt;

pub use gateway::{GatewayClient, GatewayError};
pub use prompt::{booking_links, ChatSettings, TravelMode};
