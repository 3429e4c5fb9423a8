//! Broker-level error types shared across collaborators, transports, and the issuer.
//!
//! Field-policy failures never surface through [`Error`]; they are reported as
//! [`Diagnostics`](crate::validate::Diagnostics). [`Error`] covers everything that can go wrong
//! once a request has been accepted: missing collaborators, transport failures, and
//! rejections from the identity provider.

// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; callers may retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Caller lacks permission to act as the target identity.
	#[error("Permission denied: {reason}.")]
	PermissionDenied {
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
	/// Caller credentials were rejected or have expired.
	#[error("Caller credentials were rejected: {reason}.")]
	Unauthenticated {
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
	/// Target identity (or a delegate) does not exist.
	#[error("Identity not found: {reason}.")]
	NotFound {
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
	/// Provider rejected the request payload.
	#[error("Provider rejected the request: {reason}.")]
	InvalidArgument {
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
	/// Operation is not possible with the supplied credentials.
	#[error("Unsupported operation: {reason}.")]
	Unsupported {
		/// Broker-supplied reason string.
		reason: String,
	},
}

/// Configuration and precondition failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Request body could not be encoded.
	#[error("Request body could not be serialized.")]
	RequestSerialize(#[from] serde_json::Error),
	/// Descriptor contains an invalid URL.
	#[error("Descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::provider::ProviderDescriptorError),
	/// A collaborator required by the selected issuance route was never configured.
	#[error("The issuer has no {collaborator} configured.")]
	MissingCollaborator {
		/// Human-readable collaborator label.
		collaborator: &'static str,
	},
	/// Credentials file could not be read.
	#[error("Credentials file could not be read.")]
	CredentialsFile(#[from] std::io::Error),
	/// Credentials JSON is malformed.
	#[error("Credentials JSON is malformed.")]
	CredentialsParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Credentials JSON declares a type the broker cannot use.
	#[error("Credentials type `{kind}` is not supported; expected `{expected}`.")]
	UnsupportedCredentialsType {
		/// Declared credentials type.
		kind: String,
		/// Credentials type accepted by the caller.
		expected: &'static str,
	},
	/// Service account private key could not be loaded or used for signing.
	#[error("Service account private key could not be used for signing.")]
	SigningKey {
		/// Underlying key or signing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// Request scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Provider returned an empty token value.
	#[error("The {operation} response did not include a token.")]
	EmptyToken {
		/// Operation label.
		operation: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Provider returned an unexpected but non-fatal response.
	#[error("{operation} returned an unexpected response: {message}.")]
	Upstream {
		/// Operation label.
		operation: &'static str,
		/// Provider- or broker-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Provider responded with malformed JSON that could not be parsed.
	#[error("{operation} returned malformed JSON.")]
	ResponseParse {
		/// Operation label.
		operation: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Call exceeded the caller's deadline.
	#[error("{operation} timed out.")]
	TimedOut {
		/// Operation label.
		operation: &'static str,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the identity provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the identity provider.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Renders an error together with its source chain (`outer: inner: root`).
///
/// Sources whose text is already part of the rendering are skipped.
pub fn render_chain(err: &(dyn StdError + 'static)) -> String {
	let mut rendered = err.to_string();
	let mut source = err.source();

	while let Some(inner) = source {
		let text = inner.to_string();

		if !rendered.contains(&text) {
			if rendered.ends_with('.') {
				rendered.pop();
			}

			rendered.push_str(": ");
			rendered.push_str(&text);
		}

		source = inner.source();
	}

	rendered
}
