//! Optional observability helpers for the issuer.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `impersonation_broker.issue` with the
//!   `route` and `stage` (call site) fields.
//! - Enable `metrics` to increment the `impersonation_broker_issue_total` counter for every
//!   attempt/success/failure/rejection, labeled by `route` + `outcome`.
//!
//! Neither layer ever records token values, credentials, or identity names.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Issuance routes observed by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RouteKind {
	/// `generateAccessToken` against a target.
	AccessToken,
	/// `generateIdToken` against a target.
	ImpersonatedIdToken,
	/// Identity token minted from ambient credentials.
	AmbientIdToken,
	/// Request rejected before a route could be chosen.
	Unresolved,
}
impl RouteKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RouteKind::AccessToken => "access_token",
			RouteKind::ImpersonatedIdToken => "impersonated_id_token",
			RouteKind::AmbientIdToken => "ambient_id_token",
			RouteKind::Unresolved => "unresolved",
		}
	}
}
impl Display for RouteKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each issuance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IssueOutcome {
	/// Validated request entered a route.
	Attempt,
	/// Credential issued.
	Success,
	/// Downstream or configuration failure.
	Failure,
	/// Request rejected by validation.
	Rejected,
}
impl IssueOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			IssueOutcome::Attempt => "attempt",
			IssueOutcome::Success => "success",
			IssueOutcome::Failure => "failure",
			IssueOutcome::Rejected => "rejected",
		}
	}
}
impl Display for IssueOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
