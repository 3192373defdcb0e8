//! Core domain modules
//!
//! Error taxonomy and conversation types shared by the agent, the providers
//! and the session layer.

pub mod errors;
pub mod types;

pub use errors::{ErrorCategory, PlaceNotFound, ProviderError, RequestError};
pub use types::{ChatMessage, ChatRole};
