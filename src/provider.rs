//! Provider-facing descriptors (data) and strategies (behavior).
//!
//! `descriptor` exposes validated endpoint metadata (`ProviderDescriptor`) for the IAM
//! Credentials API, the OAuth token endpoint, and the metadata server.
//! `strategy` defines [`ProviderStrategy`], an HTTP-client-agnostic hook used by the
//! collaborators to map provider error responses into the broker error taxonomy.

pub mod descriptor;
pub mod strategy;

pub use descriptor::*;
pub use strategy::*;
