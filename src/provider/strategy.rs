//! Provider strategy hooks that classify downstream failures.
//!
//! Implementations normalize error mapping without tying collaborators to any particular HTTP
//! client.

// self
use crate::{_prelude::*, provider::descriptor::Operation};

/// Strategy hook that allows providers to classify errors.
///
/// Implementors are required to be `Send + Sync`, and the hook uses crate-owned data types
/// so downstream crates never depend on reqwest-specific structures.
pub trait ProviderStrategy: Send + Sync {
	/// Maps a failed downstream response into the broker taxonomy.
	fn classify_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind;
}

/// Canonical provider error categories used by strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
	/// Caller is not allowed to act as the target identity.
	PermissionDenied,
	/// Caller credentials are invalid or expired.
	Unauthenticated,
	/// Target identity or a delegate does not exist.
	NotFound,
	/// Request payload was rejected.
	InvalidArgument,
	/// Failure is temporary and may be retried.
	Transient,
}

/// Context passed to provider strategies when classifying errors.
///
/// The struct keeps only primitive data (status codes, structured error fields, body preview)
/// so strategies stay decoupled from any HTTP client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderErrorContext {
	/// Operation associated with the failing request.
	pub operation: Operation,
	/// HTTP status code returned by the provider, when available.
	pub http_status: Option<u16>,
	/// Google RPC status (`PERMISSION_DENIED`, `NOT_FOUND`, ...) from a JSON error envelope.
	pub rpc_status: Option<String>,
	/// OAuth `error` field from token endpoint responses.
	pub oauth_error: Option<String>,
	/// Human-readable message supplied by the provider.
	pub message: Option<String>,
	/// Preview of the response body for non-JSON payloads.
	pub body_preview: Option<String>,
	/// Indicates whether the failure originated from the network/transport layer.
	pub network_error: bool,
}
impl ProviderErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates a new context scoped to the provided operation.
	pub fn new(operation: Operation) -> Self {
		Self {
			operation,
			http_status: None,
			rpc_status: None,
			oauth_error: None,
			message: None,
			body_preview: None,
			network_error: false,
		}
	}

	/// Convenience constructor for transport-level/network failures.
	pub fn network_failure(operation: Operation) -> Self {
		let mut ctx = Self::new(operation);

		ctx.network_error = true;

		ctx
	}

	/// Adds an HTTP status code (e.g., 400, 403, 500).
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the Google RPC status string.
	pub fn with_rpc_status(mut self, status: impl Into<String>) -> Self {
		self.rpc_status = Some(status.into());

		self
	}

	/// Adds the OAuth error code returned by the token endpoint.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the provider's message.
	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());

		self
	}

	/// Adds a body preview for providers that return non-JSON payloads.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		self.body_preview = Some(truncate_preview(body.into()));

		self
	}

	/// Best available description of the failure.
	pub fn reason(&self) -> String {
		self.message
			.clone()
			.or_else(|| self.oauth_error.clone())
			.or_else(|| self.body_preview.clone())
			.or_else(|| self.http_status.map(|status| format!("HTTP status {status}")))
			.unwrap_or_else(|| "no details were provided".into())
	}
}

/// Default strategy for Google endpoints.
///
/// It prioritizes the structured RPC status, then OAuth error codes, then body text hints,
/// and finally the HTTP status code. Network failures are always treated as transient.
#[derive(Debug, Default)]
pub struct DefaultProviderStrategy;
impl Display for DefaultProviderStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-provider-strategy")
	}
}
impl ProviderStrategy for DefaultProviderStrategy {
	fn classify_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		if ctx.network_error {
			return ProviderErrorKind::Transient;
		}

		if let Some(kind) = ctx.rpc_status.as_deref().and_then(classify_rpc_status) {
			return kind;
		}
		if let Some(kind) = ctx.oauth_error.as_deref().and_then(classify_oauth_error) {
			return kind;
		}
		if let Some(kind) = classify_body(ctx.body_preview.as_deref()) {
			return kind;
		}

		classify_status(ctx.http_status)
	}
}

/// Maps a classification plus context into a broker [`Error`].
pub(crate) fn error_from_kind(
	kind: ProviderErrorKind,
	ctx: &ProviderErrorContext,
	retry_after: Option<Duration>,
) -> Error {
	let reason = ctx.reason();

	match kind {
		ProviderErrorKind::PermissionDenied => Error::PermissionDenied { reason },
		ProviderErrorKind::Unauthenticated => Error::Unauthenticated { reason },
		ProviderErrorKind::NotFound => Error::NotFound { reason },
		ProviderErrorKind::InvalidArgument => Error::InvalidArgument { reason },
		ProviderErrorKind::Transient => crate::error::TransientError::Upstream {
			operation: ctx.operation.as_str(),
			message: reason,
			status: ctx.http_status,
			retry_after,
		}
		.into(),
	}
}

fn truncate_preview(body: String) -> String {
	if body.chars().count() <= ProviderErrorContext::BODY_PREVIEW_LIMIT {
		return body;
	}

	let mut buf = String::new();

	for (idx, ch) in body.chars().enumerate() {
		if idx >= ProviderErrorContext::BODY_PREVIEW_LIMIT {
			buf.push('…');

			break;
		}
		buf.push(ch);
	}

	buf
}

fn classify_rpc_status(status: &str) -> Option<ProviderErrorKind> {
	match status {
		"PERMISSION_DENIED" => Some(ProviderErrorKind::PermissionDenied),
		"UNAUTHENTICATED" => Some(ProviderErrorKind::Unauthenticated),
		"NOT_FOUND" => Some(ProviderErrorKind::NotFound),
		"INVALID_ARGUMENT" | "FAILED_PRECONDITION" | "OUT_OF_RANGE" =>
			Some(ProviderErrorKind::InvalidArgument),
		"UNAVAILABLE" | "DEADLINE_EXCEEDED" | "INTERNAL" | "RESOURCE_EXHAUSTED" | "ABORTED" =>
			Some(ProviderErrorKind::Transient),
		_ => None,
	}
}

fn classify_oauth_error(error: &str) -> Option<ProviderErrorKind> {
	if error.eq_ignore_ascii_case("invalid_grant")
		|| error.eq_ignore_ascii_case("invalid_client")
		|| error.eq_ignore_ascii_case("unauthorized_client")
	{
		Some(ProviderErrorKind::Unauthenticated)
	} else if error.eq_ignore_ascii_case("access_denied") {
		Some(ProviderErrorKind::PermissionDenied)
	} else if error.eq_ignore_ascii_case("invalid_scope")
		|| error.eq_ignore_ascii_case("invalid_request")
	{
		Some(ProviderErrorKind::InvalidArgument)
	} else if error.eq_ignore_ascii_case("temporarily_unavailable")
		|| error.eq_ignore_ascii_case("server_error")
	{
		Some(ProviderErrorKind::Transient)
	} else {
		None
	}
}

fn classify_body(body: Option<&str>) -> Option<ProviderErrorKind> {
	let body = body?;
	let lowered = body.to_ascii_lowercase();

	match lowered.as_str() {
		text if text.contains("permission") => Some(ProviderErrorKind::PermissionDenied),
		text if text.contains("invalid_grant") || text.contains("unauthenticated") =>
			Some(ProviderErrorKind::Unauthenticated),
		text if text.contains("not found") => Some(ProviderErrorKind::NotFound),
		text if text.contains("temporarily_unavailable") || text.contains("retry") =>
			Some(ProviderErrorKind::Transient),
		_ => None,
	}
}

fn classify_status(status: Option<u16>) -> ProviderErrorKind {
	match status {
		Some(401) => ProviderErrorKind::Unauthenticated,
		Some(403) => ProviderErrorKind::PermissionDenied,
		Some(404) => ProviderErrorKind::NotFound,
		Some(429) => ProviderErrorKind::Transient,
		Some(code) if (400..500).contains(&code) => ProviderErrorKind::InvalidArgument,
		_ => ProviderErrorKind::Transient,
	}
}
