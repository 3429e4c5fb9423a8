//! Scope canonicalization and normalized scope sets.

// std
use std::{
	cmp::Ordering,
	collections::BTreeSet,
	hash::{Hash, Hasher},
	slice::Iter,
	sync::OnceLock,
};
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use serde::{Deserializer, Serializer, de::Error as DeError, ser::SerializeSeq};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Scope requested when minting identity tokens from ambient credentials.
pub const USERINFO_EMAIL_SCOPE: &str = "https://www.googleapis.com/auth/userinfo.email";
/// Scope used by the broker when it needs a general-purpose caller token.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeValidationError {
	/// Empty scope entries are not allowed.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scopes cannot contain embedded whitespace characters.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// The offending scope string.
		scope: String,
	},
}

/// Maps a gcloud short scope alias to its fully-qualified URL form.
///
/// Unknown input is returned unchanged. No canonical URL is itself an alias, so the function
/// is idempotent.
pub fn canonicalize(scope: &str) -> &str {
	match scope {
		"bigquery" => "https://www.googleapis.com/auth/bigquery",
		"cloud-platform" | "default" => CLOUD_PLATFORM_SCOPE,
		"cloud-source-repos" => "https://www.googleapis.com/auth/source.full_control",
		"cloud-source-repos-ro" => "https://www.googleapis.com/auth/source.read_only",
		"compute-ro" => "https://www.googleapis.com/auth/compute.readonly",
		"compute-rw" => "https://www.googleapis.com/auth/compute",
		"datastore" => "https://www.googleapis.com/auth/datastore",
		"logging-write" => "https://www.googleapis.com/auth/logging.write",
		"monitoring" => "https://www.googleapis.com/auth/monitoring",
		"monitoring-read" => "https://www.googleapis.com/auth/monitoring.read",
		"monitoring-write" => "https://www.googleapis.com/auth/monitoring.write",
		"pubsub" => "https://www.googleapis.com/auth/pubsub",
		"service-control" => "https://www.googleapis.com/auth/servicecontrol",
		"service-management" => "https://www.googleapis.com/auth/service.management.readonly",
		"sql" => "https://www.googleapis.com/auth/sqlservice",
		"sql-admin" => "https://www.googleapis.com/auth/sqlservice.admin",
		"storage-full" => "https://www.googleapis.com/auth/devstorage.full_control",
		"storage-ro" => "https://www.googleapis.com/auth/devstorage.read_only",
		"storage-rw" => "https://www.googleapis.com/auth/devstorage.read_write",
		"taskqueue" => "https://www.googleapis.com/auth/taskqueue",
		"trace" => "https://www.googleapis.com/auth/trace.append",
		"useraccounts-ro" => "https://www.googleapis.com/auth/cloud.useraccounts.readonly",
		"useraccounts-rw" => "https://www.googleapis.com/auth/cloud.useraccounts",
		"userinfo-email" => USERINFO_EMAIL_SCOPE,
		other => other,
	}
}

/// Canonicalized, deduplicated, and sorted set of OAuth scopes.
///
/// Every entry passes through [`canonicalize`] before insertion, so `cloud-platform` and its
/// URL form collapse into one element. The [`fingerprint`](Self::fingerprint) helper lazily
/// caches a base64 (no padding) SHA-256 digest of the normalized string; observability uses it
/// in place of the raw scope list.
#[derive(Default)]
pub struct ScopeSet {
	/// The normalized scopes.
	pub scopes: Arc<[String]>,
	/// The fingerprint of the normalized scopes.
	pub fingerprint_cache: OnceLock<String>,
}
impl ScopeSet {
	/// Creates a normalized scope set from any iterator.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		Ok(Self { scopes: normalize(scopes)?, fingerprint_cache: OnceLock::new() })
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.scopes.len()
	}

	/// Returns true if no scopes are defined.
	pub fn is_empty(&self) -> bool {
		self.scopes.is_empty()
	}

	/// Returns true if the normalized set contains the provided scope (short forms accepted).
	pub fn contains(&self, scope: &str) -> bool {
		let scope = canonicalize(scope);

		self.scopes.binary_search_by(|candidate| candidate.as_str().cmp(scope)).is_ok()
	}

	/// Iterator over normalized scopes.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.scopes.iter().map(|s| s.as_str())
	}

	/// Returns the normalized string representation (space-delimited).
	pub fn normalized(&self) -> String {
		self.scopes.join(" ")
	}

	/// Stable fingerprint derived from the normalized scope list.
	pub fn fingerprint(&self) -> String {
		self.fingerprint_cache.get_or_init(|| compute_fingerprint(&self.scopes)).clone()
	}

	/// Returns the underlying slice of scope strings.
	pub fn as_slice(&self) -> &[String] {
		&self.scopes
	}

	/// Returns an owned copy of the scopes for request payloads.
	pub fn to_vec(&self) -> Vec<String> {
		self.scopes.to_vec()
	}
}
impl Clone for ScopeSet {
	fn clone(&self) -> Self {
		Self { scopes: self.scopes.clone(), fingerprint_cache: OnceLock::new() }
	}
}
impl PartialEq for ScopeSet {
	fn eq(&self, other: &Self) -> bool {
		self.scopes == other.scopes
	}
}
impl Eq for ScopeSet {}
impl PartialOrd for ScopeSet {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}
impl Ord for ScopeSet {
	fn cmp(&self, other: &Self) -> Ordering {
		self.scopes.cmp(&other.scopes)
	}
}
impl Hash for ScopeSet {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.fingerprint_cache.get_or_init(|| compute_fingerprint(&self.scopes)).hash(state);
	}
}
impl Debug for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ScopeSet").field(&self.scopes).finish()
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.normalized())
	}
}

/// Iterator over scope strings.
pub struct ScopeIter<'a> {
	inner: Iter<'a, String>,
}
impl<'a> Iterator for ScopeIter<'a> {
	type Item = &'a str;

	fn next(&mut self) -> Option<Self::Item> {
		self.inner.next().map(|s| s.as_str())
	}
}
impl TryFrom<Vec<String>> for ScopeSet {
	type Error = ScopeValidationError;

	fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl TryFrom<&[String]> for ScopeSet {
	type Error = ScopeValidationError;

	fn try_from(value: &[String]) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl<'a> IntoIterator for &'a ScopeSet {
	type IntoIter = ScopeIter<'a>;
	type Item = &'a str;

	fn into_iter(self) -> Self::IntoIter {
		ScopeIter { inner: self.scopes.iter() }
	}
}
impl FromStr for ScopeSet {
	type Err = ScopeValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.is_empty() {
			return Ok(Self::default());
		}
		if s.chars().all(char::is_whitespace) {
			return Err(ScopeValidationError::Empty);
		}

		Self::new(s.split_whitespace())
	}
}
impl Serialize for ScopeSet {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut seq = serializer.serialize_seq(Some(self.scopes.len()))?;

		for scope in self.scopes.iter() {
			seq.serialize_element(scope)?;
		}

		seq.end()
	}
}
impl<'de> Deserialize<'de> for ScopeSet {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let values = <Vec<String>>::deserialize(deserializer)?;

		ScopeSet::new(values).map_err(DeError::custom)
	}
}

fn normalize<I, S>(scopes: I) -> Result<Arc<[String]>, ScopeValidationError>
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	let mut set = BTreeSet::new();

	for scope in scopes {
		let view = scope.as_ref();

		if view.is_empty() {
			return Err(ScopeValidationError::Empty);
		}
		if view.chars().any(char::is_whitespace) {
			return Err(ScopeValidationError::ContainsWhitespace { scope: view.to_owned() });
		}

		set.insert(canonicalize(view).to_owned());
	}

	Ok(Arc::from(set.into_iter().collect::<Vec<_>>()))
}

fn compute_fingerprint(scopes: &[String]) -> String {
	let normalized = scopes.join(" ");
	let mut hasher = Sha256::new();

	hasher.update(normalized.as_bytes());

	let digest = hasher.finalize();

	STANDARD_NO_PAD.encode(digest)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const ALIASES: &[&str] = &[
		"bigquery",
		"cloud-platform",
		"cloud-source-repos",
		"cloud-source-repos-ro",
		"compute-ro",
		"compute-rw",
		"datastore",
		"default",
		"logging-write",
		"monitoring",
		"monitoring-read",
		"monitoring-write",
		"pubsub",
		"service-control",
		"service-management",
		"sql",
		"sql-admin",
		"storage-full",
		"storage-ro",
		"storage-rw",
		"taskqueue",
		"trace",
		"useraccounts-ro",
		"useraccounts-rw",
		"userinfo-email",
	];

	#[test]
	fn canonicalize_expands_aliases() {
		assert_eq!(canonicalize("cloud-platform"), CLOUD_PLATFORM_SCOPE);
		assert_eq!(canonicalize("default"), CLOUD_PLATFORM_SCOPE);
		assert_eq!(canonicalize("userinfo-email"), USERINFO_EMAIL_SCOPE);
		assert_eq!(canonicalize("storage-ro"), "https://www.googleapis.com/auth/devstorage.read_only");
		assert_eq!(canonicalize(CLOUD_PLATFORM_SCOPE), CLOUD_PLATFORM_SCOPE);
		assert_eq!(canonicalize("custom-scope"), "custom-scope");
		assert_eq!(canonicalize(""), "");
	}

	#[test]
	fn canonicalize_is_idempotent() {
		let extra = ["", "CLOUD-PLATFORM", "cloud-platform ", "https://example.com/scope", "x"];

		for input in ALIASES.iter().copied().chain(extra) {
			let once = canonicalize(input);

			assert_eq!(canonicalize(once), once, "Canonicalizing {input:?} twice must be stable.");
		}
		for alias in ALIASES {
			assert!(
				canonicalize(alias).starts_with("https://www.googleapis.com/auth/"),
				"Alias {alias} must expand to a fully-qualified scope."
			);
		}
	}

	#[test]
	fn scopes_canonicalize_and_hash_stably() {
		let lhs = ScopeSet::new(["cloud-platform", "pubsub", CLOUD_PLATFORM_SCOPE])
			.expect("Left-hand scope set should be valid.");
		let rhs = ScopeSet::new(["https://www.googleapis.com/auth/pubsub", "default"])
			.expect("Right-hand scope set should be valid.");

		assert_eq!(lhs, rhs);
		assert_eq!(lhs.len(), 2);
		assert_eq!(
			lhs.normalized(),
			"https://www.googleapis.com/auth/cloud-platform https://www.googleapis.com/auth/pubsub"
		);
		assert_eq!(lhs.fingerprint(), rhs.fingerprint());
		assert!(lhs.contains("cloud-platform"));
	}

	#[test]
	fn scopes_reject_empty_and_whitespace() {
		let err = ScopeSet::new([" pubsub "]).expect_err("Padded scopes must be rejected.");

		assert!(matches!(err, ScopeValidationError::ContainsWhitespace { .. }));
		assert_eq!(ScopeSet::new([""]), Err(ScopeValidationError::Empty));
		assert!(ScopeSet::from_str("").is_ok(), "Empty string represents an empty scope set.");
		assert!(ScopeSet::from_str("   ").is_err(), "Whitespace-only input must be rejected.");
	}

	#[test]
	fn serde_canonicalizes_on_deserialize() {
		let set: ScopeSet = serde_json::from_str("[\"trace\",\"trace\"]")
			.expect("Scope set should deserialize successfully.");

		assert_eq!(set.as_slice(), &["https://www.googleapis.com/auth/trace.append".to_owned()]);
	}
}
