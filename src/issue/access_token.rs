//! `generateAccessToken` route.

// self
use crate::{
	_prelude::*,
	auth::{IssuedCredential, ScopeSet, ServiceAccount},
	client::{GenerateAccessTokenRequest, IssueOptions},
	issue::{
		Issuer,
		common::{ERROR_GENERATING_ACCESS_TOKEN, Failure},
	},
	obs::{self, IssueOutcome, IssueSpan, RouteKind},
	request::{DelegationChain, Lifetime},
};

impl Issuer {
	pub(crate) async fn issue_access_token(
		&self,
		target: &ServiceAccount,
		scopes: &ScopeSet,
		lifetime: Lifetime,
		delegates: &DelegationChain,
		options: &IssueOptions,
	) -> Result<IssuedCredential, Failure> {
		const KIND: RouteKind = RouteKind::AccessToken;

		let span = IssueSpan::new(KIND, "generate_access_token");

		span.record_scopes(&scopes.fingerprint());
		span.record_delegates(delegates.len());
		obs::record_issue_outcome(KIND, IssueOutcome::Attempt);

		let result = span
			.instrument(async move {
				let client = self
					.impersonation_client
					.as_ref()
					.ok_or_else(|| Failure::missing("impersonation client"))?;
				let body = GenerateAccessTokenRequest {
					delegates: delegates.to_strings(),
					scope: scopes.to_vec(),
					lifetime,
				};
				let response = client
					.generate_access_token(target, &body, options)
					.await
					.map_err(|e| Failure::new(ERROR_GENERATING_ACCESS_TOKEN, e))?;

				Ok(IssuedCredential::access_token(
					response.access_token,
					response.expire_time,
					lifetime,
				))
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
		auth::{CLOUD_PLATFORM_SCOPE, TokenSecret},
		client::{
			ClientFuture, GenerateIdTokenRequest, GeneratedAccessToken, GeneratedIdToken,
			ImpersonationClient,
		},
		error::TransportError,
		issue::{ISSUER_NOT_CONFIGURED, Issued},
		request::{AccessTokenInput, RequestInput},
		validate::{FieldValue, Severity},
	};

	const TARGET: &str = "deployer@acme-prod.iam.gserviceaccount.com";
	const HOP_A: &str = "hop-a@acme-prod.iam.gserviceaccount.com";
	const HOP_B: &str = "hop-b@acme-prod.iam.gserviceaccount.com";

	#[derive(Default)]
	struct RecordingClient {
		calls: AtomicUsize,
		last: Mutex<Option<(String, GenerateAccessTokenRequest)>>,
		fail: bool,
	}
	impl ImpersonationClient for RecordingClient {
		fn generate_access_token<'a>(
			&'a self,
			target: &'a ServiceAccount,
			request: &'a GenerateAccessTokenRequest,
			_options: &'a IssueOptions,
		) -> ClientFuture<'a, GeneratedAccessToken> {
			Box::pin(async move {
				self.calls.fetch_add(1, Ordering::SeqCst);
				*self.last.lock() = Some((target.to_string(), request.clone()));

				if self.fail {
					return Err(TransportError::Io(std::io::Error::other("connection reset")).into());
				}

				Ok(GeneratedAccessToken {
					access_token: TokenSecret::new("ya29.issued"),
					expire_time: Some(OffsetDateTime::UNIX_EPOCH + Duration::hours(1)),
				})
			})
		}

		fn generate_id_token<'a>(
			&'a self,
			_target: &'a ServiceAccount,
			_request: &'a GenerateIdTokenRequest,
			_options: &'a IssueOptions,
		) -> ClientFuture<'a, GeneratedIdToken> {
			Box::pin(async move { Err(Error::Unsupported { reason: "access token stub".into() }) })
		}
	}

	fn input(target: &str, scopes: &[&str], delegates: &[&str]) -> RequestInput {
		AccessTokenInput {
			target_service_account: FieldValue::Known(target.into()),
			scopes: FieldValue::Known(scopes.iter().map(ToString::to_string).collect()),
			delegates: FieldValue::Known(delegates.iter().map(ToString::to_string).collect()),
			..Default::default()
		}
		.into()
	}

	fn issuer(client: &Arc<RecordingClient>) -> Issuer {
		Issuer::builder().impersonation_client(client.clone()).build()
	}

	#[tokio::test]
	async fn invalid_target_never_reaches_the_client() {
		let client = Arc::new(RecordingClient::default());
		let diagnostics = issuer(&client)
			.issue(&input("deployer@gmail.com", &["cloud-platform"], &[]))
			.await
			.expect_err("Non-service-account targets should be rejected.");

		assert!(diagnostics.has_error());
		assert_eq!(client.calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn canonical_scopes_delegates_and_default_lifetime_reach_the_client() {
		let client = Arc::new(RecordingClient::default());
		let Issued { credential, warnings } = issuer(&client)
			.issue(&input(TARGET, &["cloud-platform"], &[HOP_A, HOP_B]))
			.await
			.expect("Valid access token request should issue.");

		assert_eq!(credential.value.expose(), "ya29.issued");
		assert_eq!(credential.lifetime, Some(Lifetime::default()));
		assert!(credential.expires_at.is_some());
		assert_eq!(warnings.error_count(), 0);
		assert_eq!(client.calls.load(Ordering::SeqCst), 1);

		let (target, body) = client.last.lock().clone().expect("Client should record the call.");

		assert_eq!(target, TARGET);
		assert_eq!(body.scope, vec![CLOUD_PLATFORM_SCOPE.to_owned()]);
		assert_eq!(body.delegates, vec![HOP_A.to_owned(), HOP_B.to_owned()]);
		assert_eq!(body.lifetime.to_api_string(), "3600s");
	}

	#[tokio::test]
	async fn downstream_failure_becomes_single_error() {
		let client = Arc::new(RecordingClient { fail: true, ..Default::default() });
		let diagnostics = issuer(&client)
			.issue(&input(TARGET, &[CLOUD_PLATFORM_SCOPE], &[]))
			.await
			.expect_err("Transport failures should surface as diagnostics.");

		assert_eq!(diagnostics.error_count(), 1);

		let error = diagnostics.errors().next().expect("One error should be present.");

		assert_eq!(error.severity, Severity::Error);
		assert_eq!(error.summary, ERROR_GENERATING_ACCESS_TOKEN);
		assert!(error.detail.contains("connection reset"));
		assert!(!error.detail.contains("ya29"));
	}

	#[tokio::test]
	async fn missing_client_reports_issuer_not_configured() {
		let diagnostics = Issuer::builder()
			.build()
			.issue(&input(TARGET, &[CLOUD_PLATFORM_SCOPE], &[]))
			.await
			.expect_err("Issuers without an IAM client cannot mint access tokens.");
		let error = diagnostics.errors().next().expect("One error should be present.");

		assert_eq!(error.summary, ISSUER_NOT_CONFIGURED);
		assert!(error.detail.contains("impersonation client"));
	}

	#[tokio::test]
	async fn issue_request_skips_input_assembly() {
		let client = Arc::new(RecordingClient::default());
		let request = crate::request::CredentialRequest::access_token(
			ServiceAccount::new(TARGET).expect("Target fixture should be valid."),
			ScopeSet::new([CLOUD_PLATFORM_SCOPE]).expect("Scope fixture should be valid."),
			Lifetime::new(StdDuration::from_secs(900)),
		);
		let credential = issuer(&client)
			.issue_request(&request, IssueOptions::default())
			.await
			.expect("Pre-assembled requests should issue.");

		assert_eq!(credential.lifetime.map(|l| l.to_api_string()).as_deref(), Some("900s"));
	}
}
