// self
use crate::{_prelude::*, validate};

/// Requested lifetime of an access token.
///
/// Rendered in the IAM Credentials wire form: whole seconds with an `s` suffix (`3600s`). A
/// sub-second remainder rounds up to the next whole second.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lifetime(StdDuration);
impl Lifetime {
	/// Lifetime applied when the caller leaves the field unset.
	pub const DEFAULT: Self = Self(StdDuration::from_secs(3600));

	/// Wraps a duration without applying policy bounds.
	pub const fn new(duration: StdDuration) -> Self {
		Self(duration)
	}

	/// Parses a duration expression (`3600s`, `1h`, ...).
	pub fn parse(value: &str) -> Option<Self> {
		validate::parse_duration(value).map(Self)
	}

	/// Underlying duration.
	pub const fn as_duration(self) -> StdDuration {
		self.0
	}

	/// Wire representation used by `generateAccessToken`.
	pub fn to_api_string(self) -> String {
		let secs = self.0.as_secs() + u64::from(self.0.subsec_nanos() > 0);

		format!("{secs}s")
	}
}
impl Default for Lifetime {
	fn default() -> Self {
		Self::DEFAULT
	}
}
impl Display for Lifetime {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.to_api_string())
	}
}
impl Serialize for Lifetime {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.serialize_str(&self.to_api_string())
	}
}
