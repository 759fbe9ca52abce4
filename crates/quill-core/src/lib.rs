#![allow(clippy::must_use_candidate)]

mod error;
mod identity;
pub mod plans;

pub use error::HttpError;
pub use identity::Identity;
pub use plans::Tier;
