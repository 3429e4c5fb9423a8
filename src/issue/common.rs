// self
use crate::{
	_prelude::*,
	error::{ConfigError, render_chain},
	validate::{AttributePath, Diagnostic},
};

/// Summary reported when an access-token call fails downstream.
pub const ERROR_GENERATING_ACCESS_TOKEN: &str = "Error generating access token";
/// Summary reported when an impersonated identity-token call fails downstream.
pub const ERROR_GENERATING_IDENTITY_TOKEN: &str = "Error generating identity token";
/// Summary reported when the ambient credentials cannot be obtained.
pub const ERROR_RETRIEVING_AMBIENT_CREDENTIALS: &str = "Error retrieving ambient credentials";
/// Summary reported when the ambient identity-token exchange fails.
pub const UNABLE_TO_RETRIEVE_IDENTITY_TOKEN: &str = "Unable to retrieve identity token";
/// Summary reported when the route's collaborator was never configured.
pub const ISSUER_NOT_CONFIGURED: &str = "Issuer Not Configured";

/// Downstream failure tagged with the summary it is reported under.
#[derive(Debug)]
pub(crate) struct Failure {
	pub(crate) summary: &'static str,
	pub(crate) error: Error,
}
impl Failure {
	pub(crate) fn new(summary: &'static str, error: impl Into<Error>) -> Self {
		Self { summary, error: error.into() }
	}

	pub(crate) fn missing(collaborator: &'static str) -> Self {
		Self::new(ISSUER_NOT_CONFIGURED, ConfigError::MissingCollaborator { collaborator })
	}

	/// Request-level error diagnostic; the detail carries the full error chain.
	pub(crate) fn into_diagnostic(self) -> Diagnostic {
		Diagnostic::error(AttributePath::empty(), self.summary, render_chain(&self.error))
	}
}
