//! Shared request plumbing for Parley crates

mod context;
mod error;
pub mod identity;

pub use context::RequestContext;
pub use error::{ErrorBody, HttpError};
pub use identity::UserIdentity;
