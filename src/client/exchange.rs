//! Shared request execution for the JSON/text collaborators.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest,
	http::{
		Method,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderName, USER_AGENT},
	},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ConfigError, TransientError},
	http::{ResponseMetadataSlot, TokenHttpClient},
	oauth::TransportErrorMapper,
	provider::{self, Operation, ProviderErrorContext, ProviderStrategy},
};

/// Outbound call description.
pub(crate) struct Call<'a> {
	pub(crate) operation: Operation,
	pub(crate) method: Method,
	pub(crate) url: Url,
	pub(crate) bearer: Option<&'a TokenSecret>,
	pub(crate) headers: &'a [(HeaderName, &'static str)],
	pub(crate) user_agent: Option<&'a str>,
	pub(crate) body: Option<(&'static str, Vec<u8>)>,
}
impl<'a> Call<'a> {
	pub(crate) fn get(operation: Operation, url: Url) -> Self {
		Self {
			operation,
			method: Method::GET,
			url,
			bearer: None,
			headers: &[],
			user_agent: None,
			body: None,
		}
	}

	pub(crate) fn post_json(operation: Operation, url: Url, body: &impl Serialize) -> Result<Self> {
		let body = serde_json::to_vec(body).map_err(ConfigError::from)?;

		Ok(Self {
			method: Method::POST,
			body: Some(("application/json", body)),
			..Self::get(operation, url)
		})
	}

	pub(crate) fn post_form(operation: Operation, url: Url, pairs: &[(&str, &str)]) -> Self {
		let body = url::form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish();

		Self {
			method: Method::POST,
			body: Some(("application/x-www-form-urlencoded", body.into_bytes())),
			..Self::get(operation, url)
		}
	}

	pub(crate) fn bearer(mut self, token: &'a TokenSecret) -> Self {
		self.bearer = Some(token);

		self
	}

	pub(crate) fn headers(mut self, headers: &'a [(HeaderName, &'static str)]) -> Self {
		self.headers = headers;

		self
	}

	pub(crate) fn user_agent(mut self, user_agent: Option<&'a str>) -> Self {
		self.user_agent = user_agent;

		self
	}

	fn into_request(self) -> Result<HttpRequest> {
		let mut builder = oauth2::http::Request::builder()
			.method(self.method)
			.uri(self.url.as_str())
			.header(ACCEPT, "application/json");

		if let Some(token) = self.bearer {
			builder = builder.header(AUTHORIZATION, format!("Bearer {}", token.expose()));
		}
		if let Some(user_agent) = self.user_agent {
			builder = builder.header(USER_AGENT, user_agent);
		}
		for (name, value) in self.headers {
			builder = builder.header(name, *value);
		}

		let body = match self.body {
			Some((content_type, body)) => {
				builder = builder.header(CONTENT_TYPE, content_type);

				body
			},
			None => Vec::new(),
		};

		builder.body(body).map_err(|err| ConfigError::from(err).into())
	}
}

/// Sends `call` and returns the body of a successful response.
///
/// Non-2xx responses are classified by `strategy`.
pub(crate) async fn execute<C, M>(
	http_client: &C,
	mapper: &M,
	strategy: &dyn ProviderStrategy,
	call: Call<'_>,
	timeout: Option<StdDuration>,
) -> Result<Vec<u8>>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let operation = call.operation;
	let request = call.into_request()?;
	let slot = ResponseMetadataSlot::default();
	let handle = http_client.with_metadata(slot.clone(), timeout);
	let response = handle
		.call(request)
		.await
		.map_err(|err| mapper.map_transport_error(operation, slot.take().as_ref(), err))?;
	let meta = slot.take();
	let status = response.status();

	if status.is_success() {
		return Ok(response.into_body());
	}

	let ctx = error_context(operation, status.as_u16(), response.body());
	let kind = strategy.classify_error(&ctx);

	Err(provider::error_from_kind(kind, &ctx, meta.and_then(|meta| meta.retry_after)))
}

/// Absolute expiry for a relative `expires_in`, when reported and representable.
pub(crate) fn expiry_after(expires_in: Option<u64>) -> Option<OffsetDateTime> {
	expires_in
		.and_then(|secs| i64::try_from(secs).ok())
		.and_then(|secs| OffsetDateTime::now_utc().checked_add(Duration::seconds(secs)))
}

/// Decodes a JSON body with field-path aware errors.
pub(crate) fn parse_json<T>(operation: Operation, body: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
		TransientError::ResponseParse { operation: operation.as_str(), source, status: None }
			.into()
	})
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
	Rpc {
		error: RpcStatus,
	},
	OAuth {
		error: String,
		#[serde(default)]
		error_description: Option<String>,
	},
}

#[derive(Deserialize)]
struct RpcStatus {
	#[serde(default)]
	message: Option<String>,
	#[serde(default)]
	status: Option<String>,
}

fn error_context(operation: Operation, status: u16, body: &[u8]) -> ProviderErrorContext {
	let ctx = ProviderErrorContext::new(operation).with_http_status(status);

	match serde_json::from_slice::<ErrorBody>(body) {
		Ok(ErrorBody::Rpc { error }) => {
			let mut ctx = ctx;

			if let Some(message) = error.message {
				ctx = ctx.with_message(message);
			}
			if let Some(status) = error.status {
				ctx = ctx.with_rpc_status(status);
			}

			ctx
		},
		Ok(ErrorBody::OAuth { error, error_description }) => {
			let ctx = ctx.with_oauth_error(error);

			match error_description {
				Some(description) => ctx.with_message(description),
				None => ctx,
			}
		},
		Err(_) => {
			let text = String::from_utf8_lossy(body);
			let text = text.trim();

			if text.is_empty() { ctx } else { ctx.with_body_preview(text) }
		},
	}
}
