//! Issuance orchestration over the configured collaborators.
//!
//! [`Issuer`] takes a raw [`RequestInput`], assembles it into a validated
//! [`CredentialRequest`], and dispatches on the request's [`IssuanceRoute`]:
//!
//! - `AccessToken` calls `generateAccessToken` on the [`ImpersonationClient`].
//! - `ImpersonatedIdToken` calls `generateIdToken` on the [`ImpersonationClient`].
//! - `AmbientIdToken` fetches the caller's credentials from the [`CredentialProvider`] and
//!   hands them to the [`IdentityTokenExchanger`].
//!
//! Validation failures never reach a collaborator. Downstream failures are reported as a single
//! request-level error diagnostic; no partial credential is ever returned.
//!
//! [`IssuanceRoute`]: crate::request::IssuanceRoute

mod access_token;
mod common;
mod id_token;

pub use common::{
	ERROR_GENERATING_ACCESS_TOKEN, ERROR_GENERATING_IDENTITY_TOKEN,
	ERROR_RETRIEVING_AMBIENT_CREDENTIALS, ISSUER_NOT_CONFIGURED, UNABLE_TO_RETRIEVE_IDENTITY_TOKEN,
};

// self
use crate::{
	_prelude::*,
	auth::IssuedCredential,
	client::{CredentialProvider, IdentityTokenExchanger, ImpersonationClient, IssueOptions},
	issue::common::Failure,
	obs::{self, IssueOutcome, RouteKind},
	request::{Assembled, CredentialRequest, IssuanceRoute, RequestInput},
	validate::{self, AttributePath, Diagnostics, FieldId, FieldValue},
};
#[cfg(feature = "reqwest")]
use crate::{
	client::{
		ReqwestImpersonationClient, ReqwestMetadataClient, ReqwestServiceAccountKeyClient,
		ServiceAccountKey,
	},
	provider::ProviderDescriptor,
};

/// Outcome of [`Issuer::issue`].
pub type IssueResult = std::result::Result<Issued, Diagnostics>;

/// Successfully issued credential plus the warnings recorded along the way.
#[derive(Clone, Debug)]
pub struct Issued {
	/// Issued credential; owned by the caller.
	pub credential: IssuedCredential,
	/// Non-blocking diagnostics (for example non-canonical scopes).
	pub warnings: Diagnostics,
}

/// Validates credential requests and dispatches them to the configured collaborators.
///
/// Cloning is cheap; every collaborator lives behind an [`Arc`] and nothing is mutated after
/// construction.
#[derive(Clone, Default)]
pub struct Issuer {
	credential_provider: Option<Arc<dyn CredentialProvider>>,
	impersonation_client: Option<Arc<dyn ImpersonationClient>>,
	identity_token_exchanger: Option<Arc<dyn IdentityTokenExchanger>>,
	default_options: IssueOptions,
}
impl Issuer {
	/// Starts an empty builder.
	pub fn builder() -> IssuerBuilder {
		IssuerBuilder::default()
	}

	/// Runs the validator registered for `field` over a single value.
	pub fn validate_field(
		field: FieldId,
		path: &AttributePath,
		value: FieldValue<&str>,
	) -> Diagnostics {
		validate::validate_field(field, path, value)
	}

	/// Validates a request without issuing anything.
	pub fn validate(&self, input: &RequestInput) -> Diagnostics {
		match input.assemble() {
			Ok(assembled) => assembled.warnings,
			Err(diagnostics) => diagnostics,
		}
	}

	/// Validates and issues using the issuer's default options.
	pub async fn issue(&self, input: &RequestInput) -> IssueResult {
		self.issue_with(input, self.default_options).await
	}

	/// Validates and issues with explicit per-call options.
	pub async fn issue_with(&self, input: &RequestInput, options: IssueOptions) -> IssueResult {
		let Assembled { request, mut warnings } = match input.assemble() {
			Ok(assembled) => assembled,
			Err(diagnostics) => {
				obs::record_issue_outcome(RouteKind::Unresolved, IssueOutcome::Rejected);

				return Err(diagnostics);
			},
		};

		match self.dispatch(&request, &options).await {
			Ok(credential) => Ok(Issued { credential, warnings }),
			Err(failure) => {
				warnings.push(failure.into_diagnostic());

				Err(warnings)
			},
		}
	}

	/// Issues a pre-assembled request.
	pub async fn issue_request(
		&self,
		request: &CredentialRequest,
		options: IssueOptions,
	) -> Result<IssuedCredential> {
		self.dispatch(request, &options).await.map_err(|failure| failure.error)
	}

	/// Options applied by [`Issuer::issue`].
	pub fn default_options(&self) -> IssueOptions {
		self.default_options
	}

	async fn dispatch(
		&self,
		request: &CredentialRequest,
		options: &IssueOptions,
	) -> Result<IssuedCredential, Failure> {
		match &request.route {
			IssuanceRoute::AccessToken { target, scopes, lifetime } =>
				self.issue_access_token(target, scopes, *lifetime, &request.delegates, options)
					.await,
			IssuanceRoute::ImpersonatedIdToken { target, audience, include_email } =>
				self.issue_impersonated_id_token(
					target,
					audience,
					*include_email,
					&request.delegates,
					options,
				)
				.await,
			IssuanceRoute::AmbientIdToken { audience } =>
				self.issue_ambient_id_token(audience, options).await,
		}
	}
}
impl Debug for Issuer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Issuer")
			.field("credential_provider_set", &self.credential_provider.is_some())
			.field("impersonation_client_set", &self.impersonation_client.is_some())
			.field("identity_token_exchanger_set", &self.identity_token_exchanger.is_some())
			.field("default_options", &self.default_options)
			.finish()
	}
}

/// Builder for [`Issuer`]; collaborators are injected as typed trait objects.
#[derive(Clone, Default)]
pub struct IssuerBuilder {
	credential_provider: Option<Arc<dyn CredentialProvider>>,
	impersonation_client: Option<Arc<dyn ImpersonationClient>>,
	identity_token_exchanger: Option<Arc<dyn IdentityTokenExchanger>>,
	default_options: IssueOptions,
}
impl IssuerBuilder {
	/// Sets the ambient credential provider (required for ambient identity tokens).
	pub fn credential_provider(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
		self.credential_provider = Some(provider);

		self
	}

	/// Sets the IAM client (required for access tokens and impersonated identity tokens).
	pub fn impersonation_client(mut self, client: Arc<dyn ImpersonationClient>) -> Self {
		self.impersonation_client = Some(client);

		self
	}

	/// Sets the identity-token exchanger (required for ambient identity tokens).
	pub fn identity_token_exchanger(mut self, exchanger: Arc<dyn IdentityTokenExchanger>) -> Self {
		self.identity_token_exchanger = Some(exchanger);

		self
	}

	/// Sets the per-call timeout used by [`Issuer::issue`].
	pub fn default_timeout(mut self, timeout: StdDuration) -> Self {
		self.default_options.timeout = Some(timeout);

		self
	}

	/// Wires the reqwest-backed IAM client authenticated by `credentials`, and the metadata
	/// server as ambient provider and exchanger for any collaborator not set yet.
	#[cfg(feature = "reqwest")]
	pub fn with_google_defaults(
		mut self,
		descriptor: ProviderDescriptor,
		credentials: Arc<dyn CredentialProvider>,
	) -> Self {
		let metadata = Arc::new(ReqwestMetadataClient::new(descriptor.clone()));

		if self.impersonation_client.is_none() {
			self.impersonation_client =
				Some(Arc::new(ReqwestImpersonationClient::new(descriptor, credentials.clone())));
		}
		if self.credential_provider.is_none() {
			self.credential_provider = Some(credentials);
		}
		if self.identity_token_exchanger.is_none() {
			self.identity_token_exchanger = Some(metadata);
		}

		self
	}

	/// Wires a service account key as caller identity for any collaborator not set yet: the key
	/// authenticates the IAM client, supplies ambient credentials, and signs identity tokens for
	/// its own service account.
	///
	/// Fails when the key's private key cannot be loaded.
	#[cfg(feature = "reqwest")]
	pub fn with_service_account_key(
		mut self,
		descriptor: ProviderDescriptor,
		key: ServiceAccountKey,
	) -> Result<Self> {
		let client = Arc::new(ReqwestServiceAccountKeyClient::new(descriptor.clone(), key)?);

		if self.impersonation_client.is_none() {
			self.impersonation_client =
				Some(Arc::new(ReqwestImpersonationClient::new(descriptor, client.clone())));
		}
		if self.credential_provider.is_none() {
			self.credential_provider = Some(client.clone());
		}
		if self.identity_token_exchanger.is_none() {
			self.identity_token_exchanger = Some(client);
		}

		Ok(self)
	}

	/// Finishes the builder. Missing collaborators surface at issue time for the routes
	/// that need them.
	pub fn build(self) -> Issuer {
		Issuer {
			credential_provider: self.credential_provider,
			impersonation_client: self.impersonation_client,
			identity_token_exchanger: self.identity_token_exchanger,
			default_options: self.default_options,
		}
	}
}
impl Debug for IssuerBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IssuerBuilder").field("default_options", &self.default_options).finish()
	}
}
