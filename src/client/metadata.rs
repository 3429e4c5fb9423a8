//! Google compute metadata server collaborator.

// crates.io
use oauth2::http::header::HeaderName;
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret},
	client::{
		AmbientCredentials, ClientFuture, CredentialProvider, CredentialSource, GeneratedIdToken,
		IdentityTokenExchanger, IssueOptions,
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
/// Metadata client specialized for the crate's default reqwest transport stack.
pub type ReqwestMetadataClient =
	MetadataServerClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

static METADATA_FLAVOR: [(HeaderName, &str); 1] =
	[(HeaderName::from_static("metadata-flavor"), "Google")];

/// Credentials and identity tokens for the workload's default service account.
///
/// Identity tokens are minted from the workload's own identity, so the exchanger only accepts
/// credentials that came from the metadata server.
pub struct MetadataServerClient<C, M>
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
}
impl<C, M> MetadataServerClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		descriptor: ProviderDescriptor,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			descriptor,
			strategy: Arc::new(DefaultProviderStrategy),
		}
	}

	/// Replaces the error classification strategy.
	pub fn with_strategy(mut self, strategy: Arc<dyn ProviderStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	async fn get(&self, operation: Operation, url: Url, options: &IssueOptions) -> Result<Vec<u8>> {
		let call = Call::get(operation, url)
			.headers(&METADATA_FLAVOR)
			.user_agent(self.descriptor.user_agent.as_deref());

		exchange::execute(
			self.http_client.as_ref(),
			self.transport_mapper.as_ref(),
			self.strategy.as_ref(),
			call,
			options.timeout,
		)
		.await
	}
}
#[cfg(feature = "reqwest")]
impl MetadataServerClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a client with its own reqwest-backed transport.
	pub fn new(descriptor: ProviderDescriptor) -> Self {
		Self::with_http_client(descriptor, ReqwestHttpClient::default(), ReqwestTransportErrorMapper)
	}
}
impl<C, M> CredentialProvider for MetadataServerClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn ambient_credentials<'a>(
		&'a self,
		scopes: &'a ScopeSet,
		options: &'a IssueOptions,
	) -> ClientFuture<'a, AmbientCredentials> {
		Box::pin(async move {
			let scopes = scopes.iter().collect::<Vec<_>>();
			let url = self.descriptor.metadata_token_url(&scopes)?;
			let body = self.get(Operation::MetadataToken, url, options).await?;
			let token: MetadataToken = exchange::parse_json(Operation::MetadataToken, &body)?;

			if token.access_token.is_empty() {
				return Err(ConfigError::EmptyToken {
					operation: Operation::MetadataToken.as_str(),
				}
				.into());
			}

			Ok(AmbientCredentials {
				access_token: token.access_token,
				expires_at: exchange::expiry_after(token.expires_in),
				source: CredentialSource::MetadataServer,
			})
		})
	}
}
impl<C, M> IdentityTokenExchanger for MetadataServerClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn exchange<'a>(
		&'a self,
		audience: &'a str,
		credentials: &'a AmbientCredentials,
		options: &'a IssueOptions,
	) -> ClientFuture<'a, GeneratedIdToken> {
		Box::pin(async move {
			if credentials.source != CredentialSource::MetadataServer {
				return Err(Error::Unsupported {
					reason: format!(
						"identity tokens cannot be minted from {} credentials without \
						 impersonating a service account",
						credentials.source
					),
				});
			}

			let url = self.descriptor.metadata_identity_url(audience)?;
			let body = self.get(Operation::MetadataIdentity, url, options).await?;
			let token = String::from_utf8_lossy(&body).trim().to_owned();

			if token.is_empty() {
				return Err(ConfigError::EmptyToken {
					operation: Operation::MetadataIdentity.as_str(),
				}
				.into());
			}

			Ok(GeneratedIdToken { token: TokenSecret::new(token) })
		})
	}
}
impl<C, M> Debug for MetadataServerClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MetadataServerClient").field("descriptor", &self.descriptor).finish()
	}
}

#[derive(Deserialize)]
struct MetadataToken {
	access_token: TokenSecret,
	#[serde(default)]
	expires_in: Option<u64>,
}
