//! Cross-cutting error types for ferry.
//!
//! Store and engine failures have their own error enums in `ferry-store`
//! and `ferry-engine`. The CLI converges everything into `anyhow`.

use thiserror::Error;

/// Errors that can be raised by any ferry crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input was rejected before any store was touched.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A lifecycle transition was attempted that is not allowed.
    #[error("Invalid state transition: {entity} from {from} to {to}")]
    InvalidTransition {
        entity: String,
        from: String,
        to: String,
    },
}
