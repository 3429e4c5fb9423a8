//! Identity-token routes: impersonated (`generateIdToken`) and ambient (exchanger).

// self
use crate::{
	_prelude::*,
	auth::{IssuedCredential, ScopeSet, ServiceAccount, USERINFO_EMAIL_SCOPE},
	client::{GenerateIdTokenRequest, IssueOptions},
	error::ConfigError,
	issue::{
		Issuer,
		common::{
			ERROR_GENERATING_IDENTITY_TOKEN, ERROR_RETRIEVING_AMBIENT_CREDENTIALS, Failure,
			UNABLE_TO_RETRIEVE_IDENTITY_TOKEN,
		},
	},
	obs::{self, IssueOutcome, IssueSpan, RouteKind},
	request::DelegationChain,
};

impl Issuer {
	pub(crate) async fn issue_impersonated_id_token(
		&self,
		target: &ServiceAccount,
		audience: &str,
		include_email: bool,
		delegates: &DelegationChain,
		options: &IssueOptions,
	) -> Result<IssuedCredential, Failure> {
		const KIND: RouteKind = RouteKind::ImpersonatedIdToken;

		let span = IssueSpan::new(KIND, "generate_id_token");

		span.record_delegates(delegates.len());
		obs::record_issue_outcome(KIND, IssueOutcome::Attempt);

		let result = span
			.instrument(async move {
				let client = self
					.impersonation_client
					.as_ref()
					.ok_or_else(|| Failure::missing("impersonation client"))?;
				let body = GenerateIdTokenRequest {
					delegates: delegates.to_strings(),
					audience: audience.to_owned(),
					include_email,
				};
				let response = client
					.generate_id_token(target, &body, options)
					.await
					.map_err(|e| Failure::new(ERROR_GENERATING_IDENTITY_TOKEN, e))?;

				Ok(IssuedCredential::identity_token(response.token))
			})
			.await;

		match &result {
			Ok(_) => obs::record_issue_outcome(KIND, IssueOutcome::Success),
			Err(_) => obs::record_issue_outcome(KIND, IssueOutcome::Failure),
		}

		result
	}

	pub(crate) async fn issue_ambient_id_token(
		&self,
		audience: &str,
		options: &IssueOptions,
	) -> Result<IssuedCredential, Failure> {
		const KIND: RouteKind = RouteKind::AmbientIdToken;

		let span = IssueSpan::new(KIND, "exchange_ambient_credentials");

		obs::record_issue_outcome(KIND, IssueOutcome::Attempt);

		let result = span
			.instrument(async move {
				let provider = self
					.credential_provider
					.as_ref()
					.ok_or_else(|| Failure::missing("credential provider"))?;
				let exchanger = self
					.identity_token_exchanger
					.as_ref()
					.ok_or_else(|| Failure::missing("identity token exchanger"))?;
				let scopes = ScopeSet::new([USERINFO_EMAIL_SCOPE]).map_err(|e| {
					Failure::new(ERROR_RETRIEVING_AMBIENT_CREDENTIALS, ConfigError::from(e))
				})?;
				let credentials = provider
					.ambient_credentials(&scopes, options)
					.await
					.map_err(|e| Failure::new(ERROR_RETRIEVING_AMBIENT_CREDENTIALS, e))?;
				let response = exchanger
					.exchange(audience, &credentials, options)
					.await
					.map_err(|e| Failure::new(UNABLE_TO_RETRIEVE_IDENTITY_TOKEN, e))?;

				Ok(IssuedCredential::identity_token(response.token))
			})
			.await;

		match &result {
			Ok(_) => obs::record_issue_outcome(KIND, IssueOutcome::Success),
			Err(_) => obs::record_issue_outcome(KIND, IssueOutcome::Failure),
		}

		result
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::{
		auth::{CredentialKind, TokenSecret},
		client::{
			AmbientCredentials, ClientFuture, CredentialProvider, CredentialSource,
			GenerateAccessTokenRequest, GeneratedAccessToken, GeneratedIdToken,
			IdentityTokenExchanger, ImpersonationClient, StaticCredentialProvider,
		},
		issue::{ISSUER_NOT_CONFIGURED, Issued},
		request::{DELEGATES_IGNORED, IdTokenInput, RequestInput},
		validate::{FieldValue, Severity},
	};

	const TARGET: &str = "invoker@acme-prod.iam.gserviceaccount.com";
	const HOP: &str = "hop@acme-prod.iam.gserviceaccount.com";
	const HOP_B: &str = "hop-b@acme-prod.iam.gserviceaccount.com";
	const AUDIENCE: &str = "https://svc-abc123-uc.a.run.app";

	#[derive(Default)]
	struct RecordingClient {
		calls: AtomicUsize,
		last: Mutex<Option<GenerateIdTokenRequest>>,
	}
	impl ImpersonationClient for RecordingClient {
		fn generate_access_token<'a>(
			&'a self,
			_target: &'a ServiceAccount,
			_request: &'a GenerateAccessTokenRequest,
			_options: &'a IssueOptions,
		) -> ClientFuture<'a, GeneratedAccessToken> {
			Box::pin(async move { Err(Error::Unsupported { reason: "id token stub".into() }) })
		}

		fn generate_id_token<'a>(
			&'a self,
			_target: &'a ServiceAccount,
			request: &'a GenerateIdTokenRequest,
			_options: &'a IssueOptions,
		) -> ClientFuture<'a, GeneratedIdToken> {
			Box::pin(async move {
				self.calls.fetch_add(1, Ordering::SeqCst);
				*self.last.lock() = Some(request.clone());

				Ok(GeneratedIdToken { token: TokenSecret::new("eyJhbGciOiJSUzI1NiJ9.e30.sig") })
			})
		}
	}

	#[derive(Default)]
	struct RecordingExchanger {
		calls: AtomicUsize,
		last_scopes: Mutex<Vec<String>>,
	}
	impl IdentityTokenExchanger for RecordingExchanger {
		fn exchange<'a>(
			&'a self,
			audience: &'a str,
			credentials: &'a AmbientCredentials,
			_options: &'a IssueOptions,
		) -> ClientFuture<'a, GeneratedIdToken> {
			Box::pin(async move {
				self.calls.fetch_add(1, Ordering::SeqCst);

				if credentials.source != CredentialSource::Static {
					return Err(Error::Unsupported { reason: "unexpected source".into() });
				}

				Ok(GeneratedIdToken { token: TokenSecret::new(format!("ambient-for-{audience}")) })
			})
		}
	}

	struct ScopeCapturingProvider(Arc<RecordingExchanger>);
	impl CredentialProvider for ScopeCapturingProvider {
		fn ambient_credentials<'a>(
			&'a self,
			scopes: &'a ScopeSet,
			options: &'a IssueOptions,
		) -> ClientFuture<'a, AmbientCredentials> {
			Box::pin(async move {
				*self.0.last_scopes.lock() = scopes.to_vec();

				StaticCredentialProvider::new("ya29.caller").ambient_credentials(scopes, options).await
			})
		}
	}

	fn input(target: FieldValue<String>, delegates: &[&str]) -> RequestInput {
		IdTokenInput {
			target_audience: FieldValue::Known(AUDIENCE.into()),
			target_service_account: target,
			delegates: FieldValue::Known(delegates.iter().map(ToString::to_string).collect()),
			include_email: FieldValue::Known(true),
		}
		.into()
	}

	#[tokio::test]
	async fn impersonated_route_forwards_audience_and_delegates() {
		let client = Arc::new(RecordingClient::default());
		let issuer = Issuer::builder().impersonation_client(client.clone()).build();
		let Issued { credential, warnings } = issuer
			.issue(&input(FieldValue::Known(TARGET.into()), &[HOP]))
			.await
			.expect("Impersonated identity token should issue.");

		assert_eq!(credential.kind, CredentialKind::IdentityToken);
		assert!(warnings.is_empty());

		let body = client.last.lock().clone().expect("Client should record the call.");

		assert_eq!(body.audience, AUDIENCE);
		assert_eq!(body.delegates, vec![HOP.to_owned()]);
		assert!(body.include_email);
	}

	#[tokio::test]
	async fn impersonated_route_preserves_delegate_order_and_repeats() {
		let client = Arc::new(RecordingClient::default());
		let issuer = Issuer::builder().impersonation_client(client.clone()).build();

		issuer
			.issue(&input(FieldValue::Known(TARGET.into()), &[HOP_B, HOP, HOP_B]))
			.await
			.expect("Impersonated identity token should issue.");

		let body = client.last.lock().clone().expect("Client should record the call.");

		assert_eq!(body.delegates, vec![HOP_B.to_owned(), HOP.to_owned(), HOP_B.to_owned()]);
		assert_eq!(client.calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn ambient_route_uses_userinfo_scope_and_ignores_delegates() {
		let client = Arc::new(RecordingClient::default());
		let exchanger = Arc::new(RecordingExchanger::default());
		let issuer = Issuer::builder()
			.impersonation_client(client.clone())
			.credential_provider(Arc::new(ScopeCapturingProvider(exchanger.clone())))
			.identity_token_exchanger(exchanger.clone())
			.build();
		let Issued { credential, warnings } = issuer
			.issue(&input(FieldValue::Null, &[HOP]))
			.await
			.expect("Ambient identity token should issue.");

		assert_eq!(credential.value.expose(), format!("ambient-for-{AUDIENCE}"));
		assert_eq!(client.calls.load(Ordering::SeqCst), 0);
		assert_eq!(exchanger.calls.load(Ordering::SeqCst), 1);
		assert_eq!(*exchanger.last_scopes.lock(), vec![USERINFO_EMAIL_SCOPE.to_owned()]);
		assert_eq!(warnings.warning_count(), 1);
		assert_eq!(
			warnings.warnings().next().map(|w| w.summary.as_str()),
			Some(DELEGATES_IGNORED)
		);
	}

	#[tokio::test]
	async fn ambient_route_without_exchanger_is_not_configured() {
		let diagnostics = Issuer::builder()
			.credential_provider(Arc::new(StaticCredentialProvider::new("ya29.caller")))
			.build()
			.issue(&input(FieldValue::Null, &[]))
			.await
			.expect_err("Ambient tokens need an exchanger.");
		let error = diagnostics.errors().next().expect("One error should be present.");

		assert_eq!(diagnostics.error_count(), 1);
		assert_eq!(error.severity, Severity::Error);
		assert_eq!(error.summary, ISSUER_NOT_CONFIGURED);
		assert!(error.detail.contains("identity token exchanger"));
	}

	#[tokio::test]
	async fn exchanger_failure_is_reported_once() {
		struct Failing;
		impl IdentityTokenExchanger for Failing {
			fn exchange<'a>(
				&'a self,
				_audience: &'a str,
				_credentials: &'a AmbientCredentials,
				_options: &'a IssueOptions,
			) -> ClientFuture<'a, GeneratedIdToken> {
				Box::pin(async move {
					Err(Error::PermissionDenied { reason: "metadata server refused".into() })
				})
			}
		}

		let diagnostics = Issuer::builder()
			.credential_provider(Arc::new(StaticCredentialProvider::new("ya29.caller")))
			.identity_token_exchanger(Arc::new(Failing))
			.build()
			.issue(&input(FieldValue::Null, &[]))
			.await
			.expect_err("Exchanger failures should surface.");
		let error = diagnostics.errors().next().expect("One error should be present.");

		assert_eq!(diagnostics.error_count(), 1);
		assert_eq!(error.summary, UNABLE_TO_RETRIEVE_IDENTITY_TOKEN);
		assert_eq!(error.detail, "Permission denied: metadata server refused.");
		assert!(!error.detail.contains("ya29.caller"));
	}
}
