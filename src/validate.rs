//! Field validators and the diagnostics they produce.
//!
//! Each validator is a stateless predicate over one string value. Validators never fail; they
//! append zero or more [`Diagnostic`]s to a [`Diagnostics`] collection. Errors block issuance,
//! warnings are carried through to the caller alongside the issued credential.
//!
//! Validators are registered per field through [`FieldId::validator`], so the set of checks a
//! request runs is visible in one table instead of being discovered at runtime.

pub mod duration;
pub mod identity;
pub mod scope;

pub use duration::*;
pub use identity::ServiceAccountNameValidator;
pub use scope::*;

// std
use std::slice::Iter;
// self
use crate::_prelude::*;

/// Value of a field as seen by validators.
///
/// `Null` means the caller left the field out; `Unknown` means the value is not yet determined
/// (for example, it depends on another resource). Validators defer on both.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FieldValue<T> {
	/// Field was omitted.
	#[default]
	Null,
	/// Value is not yet known.
	Unknown,
	/// Concrete value.
	Known(T),
}
impl<T> FieldValue<T> {
	/// Returns true for [`FieldValue::Null`].
	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}

	/// Returns true for [`FieldValue::Unknown`].
	pub fn is_unknown(&self) -> bool {
		matches!(self, Self::Unknown)
	}

	/// Borrows the concrete value, if any.
	pub fn known(&self) -> Option<&T> {
		match self {
			Self::Known(value) => Some(value),
			_ => None,
		}
	}

	/// Converts `&FieldValue<T>` into `FieldValue<&T>`.
	pub fn as_ref(&self) -> FieldValue<&T> {
		match self {
			Self::Null => FieldValue::Null,
			Self::Unknown => FieldValue::Unknown,
			Self::Known(value) => FieldValue::Known(value),
		}
	}
}
impl FieldValue<String> {
	/// Borrows a string field as `FieldValue<&str>`.
	pub fn as_deref(&self) -> FieldValue<&str> {
		match self {
			Self::Null => FieldValue::Null,
			Self::Unknown => FieldValue::Unknown,
			Self::Known(value) => FieldValue::Known(value.as_str()),
		}
	}
}
impl FieldValue<Vec<String>> {
	/// Borrows a list field as `FieldValue<&[String]>`.
	pub fn as_slice(&self) -> FieldValue<&[String]> {
		match self {
			Self::Null => FieldValue::Null,
			Self::Unknown => FieldValue::Unknown,
			Self::Known(values) => FieldValue::Known(values.as_slice()),
		}
	}
}
impl<T> From<Option<T>> for FieldValue<T> {
	fn from(value: Option<T>) -> Self {
		value.map_or(Self::Null, Self::Known)
	}
}

/// Diagnostic severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
	/// Blocks issuance.
	Error,
	/// Informational; issuance proceeds.
	Warning,
}
impl Severity {
	/// Returns a stable label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Severity::Error => "error",
			Severity::Warning => "warning",
		}
	}
}
impl Display for Severity {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// One step of an [`AttributePath`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStep {
	/// Named attribute.
	Attribute(String),
	/// Element of a list or set attribute.
	Index(usize),
}

/// Locator of the field a diagnostic refers to; empty for request-level diagnostics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributePath(Vec<PathStep>);
impl AttributePath {
	/// Request-level path.
	pub fn empty() -> Self {
		Self::default()
	}

	/// Path rooted at a named attribute.
	pub fn root(name: impl Into<String>) -> Self {
		Self(vec![PathStep::Attribute(name.into())])
	}

	/// Extends the path with a list index.
	pub fn index(mut self, index: usize) -> Self {
		self.0.push(PathStep::Index(index));

		self
	}

	/// Extends the path with a nested attribute.
	pub fn attribute(mut self, name: impl Into<String>) -> Self {
		self.0.push(PathStep::Attribute(name.into()));

		self
	}

	/// Returns true for request-level paths.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Steps making up the path.
	pub fn steps(&self) -> &[PathStep] {
		&self.0
	}
}
impl Display for AttributePath {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		if self.0.is_empty() {
			return f.write_str("<request>");
		}

		for (idx, step) in self.0.iter().enumerate() {
			match step {
				PathStep::Attribute(name) if idx == 0 => f.write_str(name)?,
				PathStep::Attribute(name) => write!(f, ".{name}")?,
				PathStep::Index(index) => write!(f, "[{index}]")?,
			}
		}

		Ok(())
	}
}

/// Field-attributed validation or execution outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
	/// Field the diagnostic refers to.
	pub path: AttributePath,
	/// Error or warning.
	pub severity: Severity,
	/// Stable summary suitable for programmatic matching.
	pub summary: String,
	/// Specific human-readable explanation.
	pub detail: String,
}
impl Diagnostic {
	/// Creates an error diagnostic.
	pub fn error(
		path: AttributePath,
		summary: impl Into<String>,
		detail: impl Into<String>,
	) -> Self {
		Self { path, severity: Severity::Error, summary: summary.into(), detail: detail.into() }
	}

	/// Creates a warning diagnostic.
	pub fn warning(
		path: AttributePath,
		summary: impl Into<String>,
		detail: impl Into<String>,
	) -> Self {
		Self { path, severity: Severity::Warning, summary: summary.into(), detail: detail.into() }
	}

	/// Returns true for error-severity diagnostics.
	pub fn is_error(&self) -> bool {
		self.severity == Severity::Error
	}
}
impl Display for Diagnostic {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{} at {}: {}: {}", self.severity, self.path, self.summary, self.detail)
	}
}

/// Ordered, append-only collection of diagnostics for one call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);
impl Diagnostics {
	/// Creates an empty collection.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a diagnostic.
	pub fn push(&mut self, diagnostic: Diagnostic) {
		self.0.push(diagnostic);
	}

	/// Appends an error diagnostic.
	pub fn add_error(
		&mut self,
		path: AttributePath,
		summary: impl Into<String>,
		detail: impl Into<String>,
	) {
		self.push(Diagnostic::error(path, summary, detail));
	}

	/// Appends a warning diagnostic.
	pub fn add_warning(
		&mut self,
		path: AttributePath,
		summary: impl Into<String>,
		detail: impl Into<String>,
	) {
		self.push(Diagnostic::warning(path, summary, detail));
	}

	/// Appends every diagnostic from `other`.
	pub fn append(&mut self, other: Diagnostics) {
		self.0.extend(other.0);
	}

	/// Returns true when at least one error-severity diagnostic exists.
	pub fn has_error(&self) -> bool {
		self.0.iter().any(Diagnostic::is_error)
	}

	/// Error-severity diagnostics.
	pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
		self.0.iter().filter(|d| d.is_error())
	}

	/// Warning-severity diagnostics.
	pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
		self.0.iter().filter(|d| !d.is_error())
	}

	/// Number of error-severity diagnostics.
	pub fn error_count(&self) -> usize {
		self.errors().count()
	}

	/// Number of warning-severity diagnostics.
	pub fn warning_count(&self) -> usize {
		self.warnings().count()
	}

	/// Total number of diagnostics.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true when no diagnostics were recorded.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterator over all diagnostics in insertion order.
	pub fn iter(&self) -> Iter<'_, Diagnostic> {
		self.0.iter()
	}

	/// Consumes the collection.
	pub fn into_vec(self) -> Vec<Diagnostic> {
		self.0
	}
}
impl Display for Diagnostics {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		for (idx, diagnostic) in self.0.iter().enumerate() {
			if idx > 0 {
				f.write_str("\n")?;
			}

			Display::fmt(diagnostic, f)?;
		}

		Ok(())
	}
}
impl StdError for Diagnostics {}
impl From<Diagnostic> for Diagnostics {
	fn from(value: Diagnostic) -> Self {
		Self(vec![value])
	}
}
impl Extend<Diagnostic> for Diagnostics {
	fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
		self.0.extend(iter);
	}
}
impl IntoIterator for Diagnostics {
	type IntoIter = std::vec::IntoIter<Diagnostic>;
	type Item = Diagnostic;

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}
impl<'a> IntoIterator for &'a Diagnostics {
	type IntoIter = Iter<'a, Diagnostic>;
	type Item = &'a Diagnostic;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}

/// Shared capability of every string validator.
pub trait StringValidator {
	/// Plain-text description of what the validator enforces.
	fn description(&self) -> &'static str;

	/// Validates one value, appending diagnostics attributed to `path`.
	fn validate(&self, path: &AttributePath, value: FieldValue<&str>, out: &mut Diagnostics);
}

/// Closed set of validators the broker knows how to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldValidator {
	/// Service account identity format.
	ServiceAccountName(ServiceAccountNameValidator),
	/// Bounded duration expression.
	Duration(DurationValidator),
	/// Scope canonical-form advisory.
	ServiceScope(ServiceScopeValidator),
}
impl FieldValidator {
	/// Validates a value and returns the produced diagnostics.
	pub fn validate(&self, path: &AttributePath, value: FieldValue<&str>) -> Diagnostics {
		let mut out = Diagnostics::new();

		self.validate_into(path, value, &mut out);

		out
	}

	/// Validates a value, appending to an existing collection.
	pub fn validate_into(
		&self,
		path: &AttributePath,
		value: FieldValue<&str>,
		out: &mut Diagnostics,
	) {
		self.as_validator().validate(path, value, out);
	}

	/// Plain-text description of the validator.
	pub fn description(&self) -> &'static str {
		self.as_validator().description()
	}

	fn as_validator(&self) -> &dyn StringValidator {
		match self {
			Self::ServiceAccountName(v) => v,
			Self::Duration(v) => v,
			Self::ServiceScope(v) => v,
		}
	}
}

/// Request fields the broker knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldId {
	/// Service account to impersonate.
	TargetServiceAccount,
	/// Delegation chain element.
	Delegates,
	/// Access-token scope element.
	Scopes,
	/// Access-token lifetime.
	Lifetime,
	/// Identity-token audience.
	TargetAudience,
	/// Whether identity tokens carry the `email` claim.
	IncludeEmail,
}
impl FieldId {
	/// Attribute name used in diagnostic paths.
	pub const fn attribute(self) -> &'static str {
		match self {
			FieldId::TargetServiceAccount => "target_service_account",
			FieldId::Delegates => "delegates",
			FieldId::Scopes => "scopes",
			FieldId::Lifetime => "lifetime",
			FieldId::TargetAudience => "target_audience",
			FieldId::IncludeEmail => "include_email",
		}
	}

	/// Validator registered for the field (applied per element for list fields).
	pub const fn validator(self) -> Option<FieldValidator> {
		match self {
			FieldId::TargetServiceAccount | FieldId::Delegates =>
				Some(FieldValidator::ServiceAccountName(ServiceAccountNameValidator)),
			FieldId::Scopes => Some(FieldValidator::ServiceScope(ServiceScopeValidator)),
			FieldId::Lifetime => Some(FieldValidator::Duration(DurationValidator::LIFETIME)),
			FieldId::TargetAudience | FieldId::IncludeEmail => None,
		}
	}

	/// Root path for the field.
	pub fn path(self) -> AttributePath {
		AttributePath::root(self.attribute())
	}
}
impl Display for FieldId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.attribute())
	}
}

/// Runs the registered validator for `field` over a single value.
pub fn validate_field(
	field: FieldId,
	path: &AttributePath,
	value: FieldValue<&str>,
) -> Diagnostics {
	field.validator().map(|validator| validator.validate(path, value)).unwrap_or_default()
}

/// Runs the registered validator for `field` over every element of a list value.
pub fn validate_field_elements(
	field: FieldId,
	values: FieldValue<&[String]>,
	out: &mut Diagnostics,
) {
	let (Some(validator), FieldValue::Known(values)) = (field.validator(), values) else {
		return;
	};

	for (idx, value) in values.iter().enumerate() {
		validator.validate_into(&field.path().index(idx), FieldValue::Known(value.as_str()), out);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn attribute_paths_render() {
		assert_eq!(AttributePath::empty().to_string(), "<request>");
		assert_eq!(FieldId::Delegates.path().index(2).to_string(), "delegates[2]");
		assert_eq!(AttributePath::root("a").attribute("b").index(0).to_string(), "a.b[0]");
	}

	#[test]
	fn diagnostics_aggregate_by_severity() {
		let mut diagnostics = Diagnostics::new();

		diagnostics.add_warning(FieldId::Scopes.path(), "Non-canonical service scope", "detail");

		assert!(!diagnostics.has_error());

		diagnostics.add_error(FieldId::Lifetime.path(), "Duration Too Long", "detail");

		assert!(diagnostics.has_error());
		assert_eq!(diagnostics.error_count(), 1);
		assert_eq!(diagnostics.warning_count(), 1);
		assert_eq!(diagnostics.len(), 2);
		assert_eq!(
			diagnostics.iter().map(|d| d.summary.as_str()).collect::<Vec<_>>(),
			vec!["Non-canonical service scope", "Duration Too Long"]
		);
	}

	#[test]
	fn registry_matches_fields() {
		assert!(matches!(
			FieldId::TargetServiceAccount.validator(),
			Some(FieldValidator::ServiceAccountName(_))
		));
		assert!(matches!(FieldId::Scopes.validator(), Some(FieldValidator::ServiceScope(_))));
		assert_eq!(
			FieldId::Lifetime.validator(),
			Some(FieldValidator::Duration(DurationValidator::at_most(StdDuration::from_secs(3600))))
		);
		assert!(FieldId::TargetAudience.validator().is_none());
		assert!(
			validate_field(
				FieldId::TargetAudience,
				&FieldId::TargetAudience.path(),
				FieldValue::Known("")
			)
			.is_empty()
		);
	}

	#[test]
	fn list_fields_validate_each_element_with_index() {
		let delegates = vec![
			"first@acme.iam.gserviceaccount.com".to_owned(),
			"not-a-service-account".to_owned(),
			String::new(),
		];
		let mut out = Diagnostics::new();

		validate_field_elements(
			FieldId::Delegates,
			FieldValue::Known(delegates.as_slice()),
			&mut out,
		);

		assert_eq!(out.error_count(), 2);
		assert_eq!(
			out.iter().map(|d| d.path.to_string()).collect::<Vec<_>>(),
			vec!["delegates[1]", "delegates[2]"]
		);
	}
}
