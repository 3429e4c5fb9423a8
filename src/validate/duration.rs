//! Bounded duration validation for token lifetimes.

// self
use crate::{
	_prelude::*,
	validate::{AttributePath, Diagnostics, FieldValue, StringValidator},
};

/// Summary emitted when a value cannot be parsed as a duration.
pub const INVALID_DURATION_FORMAT: &str = "Invalid Duration Format";
/// Summary emitted when a value is below the configured minimum.
pub const DURATION_TOO_SHORT: &str = "Duration Too Short";
/// Summary emitted when a value exceeds the configured maximum.
pub const DURATION_TOO_LONG: &str = "Duration Too Long";

/// Parses a duration expression such as `3600s`, `60m`, or `1h`.
///
/// The grammar is humantime's: one or more `<integer><unit>` terms, optionally separated by
/// spaces (`1h 30m`, `1h30m`), with long unit names accepted (`2days`, `90sec`). Write
/// fractional values as compound terms (`1h30m`, not `1.5h`). A bare number without a unit
/// is rejected.
pub fn parse_duration(value: &str) -> Option<StdDuration> {
	humantime::parse_duration(value).ok()
}

/// Validates a duration expression against inclusive bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DurationValidator {
	/// Optional inclusive lower bound.
	pub min: Option<StdDuration>,
	/// Inclusive upper bound.
	pub max: StdDuration,
}
impl DurationValidator {
	/// Policy applied to access-token lifetimes: at most one hour, no lower bound.
	pub const LIFETIME: Self = Self::at_most(StdDuration::from_secs(3600));

	/// Upper-bound-only policy.
	pub const fn at_most(max: StdDuration) -> Self {
		Self { min: None, max }
	}

	/// Policy with both bounds.
	pub const fn between(min: StdDuration, max: StdDuration) -> Self {
		Self { min: Some(min), max }
	}
}
impl StringValidator for DurationValidator {
	fn description(&self) -> &'static str {
		"value must be a valid duration string within the configured bounds"
	}

	fn validate(&self, path: &AttributePath, value: FieldValue<&str>, out: &mut Diagnostics) {
		let FieldValue::Known(value) = value else {
			return;
		};
		let Some(duration) = parse_duration(value) else {
			out.add_error(
				path.clone(),
				INVALID_DURATION_FORMAT,
				"Duration must be a valid duration string (e.g., '3600s', '1h')",
			);

			return;
		};

		if let Some(min) = self.min.filter(|min| duration < *min) {
			out.add_error(
				path.clone(),
				DURATION_TOO_SHORT,
				format!(
					"Duration must be greater than or equal to {}",
					humantime::format_duration(min)
				),
			);
		}
		if duration > self.max {
			out.add_error(
				path.clone(),
				DURATION_TOO_LONG,
				format!(
					"Duration must be less than or equal to {}",
					humantime::format_duration(self.max)
				),
			);
		}
	}
}
