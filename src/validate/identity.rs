//! Service account identity patterns and the validator built on them.

// std
use std::sync::LazyLock;
// crates.io
use regex::Regex;
// self
use crate::{
	auth::IdentifierError,
	validate::{AttributePath, Diagnostics, FieldValue, StringValidator},
};

/// Accepted service account email shapes.
pub const SERVICE_ACCOUNT_PATTERNS: [&str; 6] = [
	// User-managed service accounts.
	r"^.+@.+\.iam\.gserviceaccount\.com$",
	// Legacy developer accounts.
	r"^.+@developer\.gserviceaccount\.com$",
	// App Engine default accounts.
	r"^.+@appspot\.gserviceaccount\.com$",
	// Google APIs service agents.
	r"^.+@cloudservices\.gserviceaccount\.com$",
	// Cloud Build.
	r"^.+@cloudbuild\.gserviceaccount\.com$",
	// Compute Engine service agents.
	r"^service-[0-9]+@.+-compute\.iam\.gserviceaccount\.com$",
];

static COMPILED: LazyLock<Vec<Regex>> = LazyLock::new(|| {
	SERVICE_ACCOUNT_PATTERNS.iter().filter_map(|pattern| Regex::new(pattern).ok()).collect()
});

/// Summary shared by every identity diagnostic.
pub const INVALID_SERVICE_ACCOUNT_NAME: &str = "Invalid Service Account Name";

/// Returns true when `value` matches at least one accepted pattern.
pub fn is_service_account(value: &str) -> bool {
	COMPILED.iter().any(|pattern| pattern.is_match(value))
}

/// Validates that a value is a Google service account email.
///
/// Produces at most one error. The candidate value is never logged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ServiceAccountNameValidator;
impl StringValidator for ServiceAccountNameValidator {
	fn description(&self) -> &'static str {
		"value must be a valid service account email address"
	}

	fn validate(&self, path: &AttributePath, value: FieldValue<&str>, out: &mut Diagnostics) {
		let FieldValue::Known(value) = value else {
			return;
		};
		let err = if value.is_empty() {
			IdentifierError::Empty
		} else if is_service_account(value) {
			return;
		} else {
			IdentifierError::UnrecognizedPattern
		};
		let detail = err.to_string();

		out.add_error(path.clone(), INVALID_SERVICE_ACCOUNT_NAME, detail.trim_end_matches('.'));
	}
}
