//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod alerts;
pub mod confirmations;
pub mod evaluate;
pub mod goals;
pub mod protection;
pub mod reports;
pub mod status;
pub mod transactions;

// Re-export all handlers for use in router
pub use alerts::*;
pub use confirmations::*;
pub use evaluate::*;
pub use goals::*;
pub use protection::*;
pub use reports::*;
pub use status::*;
pub use transactions::*;
