//! Strongly typed service account identities enforced across the broker domain.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::{_prelude::*, validate::identity};

/// Error returned when a service account identity fails format policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identity was empty.
	#[error("Service account name must not be empty.")]
	Empty,
	/// The identity matched none of the accepted service account patterns.
	#[error(
		"Service account name must match one of the expected patterns for Google service accounts."
	)]
	UnrecognizedPattern,
}

/// Email of a Google service account that can be impersonated or used as a delegate.
///
/// Construction always runs the same pattern check as
/// [`ServiceAccountNameValidator`](crate::validate::ServiceAccountNameValidator), so holding a
/// value proves the identity passed format policy.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceAccount(String);
impl ServiceAccount {
	/// Creates a new identity after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}

	/// Returns the IAM resource name (`projects/-/serviceAccounts/{email}`).
	pub fn resource_name(&self) -> String {
		format!("projects/-/serviceAccounts/{}", self.0)
	}
}
impl Deref for ServiceAccount {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for ServiceAccount {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<ServiceAccount> for String {
	fn from(value: ServiceAccount) -> Self {
		value.0
	}
}
impl TryFrom<String> for ServiceAccount {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl Borrow<str> for ServiceAccount {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl Debug for ServiceAccount {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "ServiceAccount({})", self.0)
	}
}
impl Display for ServiceAccount {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for ServiceAccount {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

fn validate_view(view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty);
	}
	if !identity::is_service_account(view) {
		return Err(IdentifierError::UnrecognizedPattern);
	}

	Ok(())
}
