//! HTTP layer — REST snapshot client with retry policies.

pub mod client;
pub mod retry;

pub use client::MarketHttp;
pub use retry::{RetryConfig, RetryPolicy};
