//! Scope canonical-form advisory.

// self
use crate::{
	auth,
	validate::{AttributePath, Diagnostics, FieldValue, StringValidator},
};

/// Summary emitted for scopes that will be rewritten.
pub const NON_CANONICAL_SERVICE_SCOPE: &str = "Non-canonical service scope";

/// Warns when a scope is written in a short form that will be canonicalized.
///
/// Never produces errors; emptiness and multiplicity are enforced when the request is assembled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ServiceScopeValidator;
impl StringValidator for ServiceScopeValidator {
	fn description(&self) -> &'static str {
		"service scope must be in canonical form"
	}

	fn validate(&self, path: &AttributePath, value: FieldValue<&str>, out: &mut Diagnostics) {
		let FieldValue::Known(value) = value else {
			return;
		};
		let canonical = auth::canonicalize(value);

		if canonical != value {
			out.add_warning(
				path.clone(),
				NON_CANONICAL_SERVICE_SCOPE,
				format!("Service scope {value:?} will be canonicalized to {canonical:?}"),
			);
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn run(value: FieldValue<&str>) -> Diagnostics {
		let mut out = Diagnostics::new();

		ServiceScopeValidator.validate(&AttributePath::root("scopes").index(0), value, &mut out);

		out
	}

	#[test]
	fn canonical_scope_is_silent() {
		assert!(run(FieldValue::Known("https://www.googleapis.com/auth/cloud-platform")).is_empty());
		assert!(run(FieldValue::Known("https://example.com/custom")).is_empty());
	}

	#[test]
	fn short_scope_warns_once() {
		let out = run(FieldValue::Known("cloud-platform"));

		assert_eq!(out.len(), 1);
		assert!(!out.has_error());
		assert_eq!(out.warning_count(), 1);

		let warning = out.warnings().next().expect("Warning should be recorded.");

		assert_eq!(warning.summary, NON_CANONICAL_SERVICE_SCOPE);
		assert_eq!(
			warning.detail,
			"Service scope \"cloud-platform\" will be canonicalized to \"https://www.googleapis.com/auth/cloud-platform\""
		);
		assert_eq!(warning.path.to_string(), "scopes[0]");
	}

	#[test]
	fn empty_null_and_unknown_are_silent() {
		assert!(run(FieldValue::Known("")).is_empty());
		assert!(run(FieldValue::Null).is_empty());
		assert!(run(FieldValue::Unknown).is_empty());
	}
}
