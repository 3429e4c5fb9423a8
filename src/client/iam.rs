//! IAM Credentials API client.

// self
use crate::{
	_prelude::*,
	auth::{CLOUD_PLATFORM_SCOPE, ScopeSet, ServiceAccount},
	client::{
		ClientFuture, CredentialProvider, GenerateAccessTokenRequest, GenerateIdTokenRequest,
		GeneratedAccessToken, GeneratedIdToken, ImpersonationClient, IssueOptions,
		exchange::{self, Call},
	},
	error::ConfigError,
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	provider::{DefaultProviderStrategy, Operation, ProviderDescriptor, ProviderStrategy},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// IAM client specialized for the crate's default reqwest transport stack.
pub type ReqwestImpersonationClient =
	IamCredentialsClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// [`ImpersonationClient`] backed by the IAM Credentials REST API.
///
/// Every call first obtains the caller's credentials for the `cloud-platform` scope from the
/// injected [`CredentialProvider`] and presents them as a bearer token.
pub struct IamCredentialsClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Endpoint descriptor.
	pub descriptor: ProviderDescriptor,
	/// Strategy responsible for error classification.
	pub strategy: Arc<dyn ProviderStrategy>,
	/// Source of the caller's bearer credentials.
	pub credentials: Arc<dyn CredentialProvider>,
}
impl<C, M> IamCredentialsClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		descriptor: ProviderDescriptor,
		credentials: Arc<dyn CredentialProvider>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			descriptor,
			strategy: Arc::new(DefaultProviderStrategy),
			credentials,
		}
	}

	/// Replaces the error classification strategy.
	pub fn with_strategy(mut self, strategy: Arc<dyn ProviderStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	async fn post<T>(
		&self,
		operation: Operation,
		url: Url,
		body: &(impl Serialize + Sync),
		options: &IssueOptions,
	) -> Result<T>
	where
		T: for<'de> Deserialize<'de>,
	{
		let scopes = ScopeSet::new([CLOUD_PLATFORM_SCOPE]).map_err(ConfigError::from)?;
		let caller = self.credentials.ambient_credentials(&scopes, options).await?;
		let call = Call::post_json(operation, url, body)?
			.bearer(&caller.access_token)
			.user_agent(self.descriptor.user_agent.as_deref());
		let body = exchange::execute(
			self.http_client.as_ref(),
			self.transport_mapper.as_ref(),
			self.strategy.as_ref(),
			call,
			options.timeout,
		)
		.await?;

		exchange::parse_json(operation, &body)
	}
}
#[cfg(feature = "reqwest")]
impl IamCredentialsClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a client with its own reqwest-backed transport.
	pub fn new(descriptor: ProviderDescriptor, credentials: Arc<dyn CredentialProvider>) -> Self {
		Self::with_http_client(
			descriptor,
			credentials,
			ReqwestHttpClient::default(),
			ReqwestTransportErrorMapper,
		)
	}
}
impl<C, M> ImpersonationClient for IamCredentialsClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn generate_access_token<'a>(
		&'a self,
		target: &'a ServiceAccount,
		request: &'a GenerateAccessTokenRequest,
		options: &'a IssueOptions,
	) -> ClientFuture<'a, GeneratedAccessToken> {
		Box::pin(async move {
			let url = self.descriptor.generate_access_token_url(target)?;
			let response: GeneratedAccessToken =
				self.post(Operation::GenerateAccessToken, url, request, options).await?;

			if response.access_token.is_empty() {
				return Err(ConfigError::EmptyToken {
					operation: Operation::GenerateAccessToken.as_str(),
				}
				.into());
			}

			Ok(response)
		})
	}

	fn generate_id_token<'a>(
		&'a self,
		target: &'a ServiceAccount,
		request: &'a GenerateIdTokenRequest,
		options: &'a IssueOptions,
	) -> ClientFuture<'a, GeneratedIdToken> {
		Box::pin(async move {
			let url = self.descriptor.generate_id_token_url(target)?;
			let response: GeneratedIdToken =
				self.post(Operation::GenerateIdToken, url, request, options).await?;

			if response.token.is_empty() {
				return Err(ConfigError::EmptyToken {
					operation: Operation::GenerateIdToken.as_str(),
				}
				.into());
			}

			Ok(response)
		})
	}
}
impl<C, M> Debug for IamCredentialsClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IamCredentialsClient").field("descriptor", &self.descriptor).finish()
	}
}
