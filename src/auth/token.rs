//! Issued credential models and secret wrappers.

pub mod credential;
pub mod secret;
