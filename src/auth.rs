//! Auth-domain identities, scope sets, and issued credential models.

pub mod id;
pub mod scope;
pub mod token;

pub use id::*;
pub use scope::*;
pub use token::{credential::*, secret::*};
