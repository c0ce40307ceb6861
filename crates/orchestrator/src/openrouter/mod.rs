//! Client for OpenAI-compatible chat completion APIs (OpenRouter by default).

pub mod client;
pub mod types;

pub use client::{OpenRouterClient, RetryPolicy, DEFAULT_BASE_URL};
pub use types::*;
