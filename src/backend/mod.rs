//! Access to the hosted record store: customers, saved itineraries and
//! conversations.

mod cache;
mod cached_client;
pub mod client;
pub mod types;

pub use cached_client::CachedBackend;
pub use client::BackendClient;
