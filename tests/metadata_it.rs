mod common;

// crates.io
use httpmock::prelude::*;
use serde_json::json;
use time::{Duration, OffsetDateTime};
// self
use common::*;
use impersonation_broker::{
	auth::{ScopeSet, TokenSecret, USERINFO_EMAIL_SCOPE},
	client::{
		AmbientCredentials, CredentialProvider, CredentialSource, IdentityTokenExchanger,
		IssueOptions, MetadataServerClient,
	},
	error::Error,
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
};

type TestClient = MetadataServerClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";
const IDENTITY_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/identity";

fn build_client(server: &MockServer) -> TestClient {
	MetadataServerClient::with_http_client(
		test_descriptor(&server.base_url()),
		test_reqwest_http_client(),
		ReqwestTransportErrorMapper,
	)
}

fn metadata_credentials() -> AmbientCredentials {
	AmbientCredentials {
		access_token: TokenSecret::new("ya29.metadata"),
		expires_at: None,
		source: CredentialSource::MetadataServer,
	}
}

#[tokio::test]
async fn token_request_sends_flavor_header_and_scopes() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(TOKEN_PATH)
				.header("metadata-flavor", "Google")
				.query_param("scopes", USERINFO_EMAIL_SCOPE);
			then.status(200).json_body(json!({
				"access_token": "ya29.metadata",
				"expires_in": 3599,
				"token_type": "Bearer"
			}));
		})
		.await;
	let scopes = ScopeSet::new([USERINFO_EMAIL_SCOPE]).expect("Scope fixture should be valid.");
	let before = OffsetDateTime::now_utc();
	let credentials = build_client(&server)
		.ambient_credentials(&scopes, &IssueOptions::default())
		.await
		.expect("Metadata token request should succeed.");

	mock.assert_async().await;

	assert_eq!(credentials.access_token.expose(), "ya29.metadata");
	assert_eq!(credentials.source, CredentialSource::MetadataServer);

	let expires_at = credentials.expires_at.expect("expires_in should produce an expiry.");

	assert!(expires_at >= before + Duration::seconds(3599));
}

#[tokio::test]
async fn identity_request_returns_trimmed_text_body() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(IDENTITY_PATH)
				.header("metadata-flavor", "Google")
				.query_param("audience", "https://svc.example.com")
				.query_param("format", "full");
			then.status(200)
				.header("content-type", "text/html")
				.body("eyJhbGciOiJSUzI1NiJ9.e30.sig\n");
		})
		.await;
	let token = build_client(&server)
		.exchange("https://svc.example.com", &metadata_credentials(), &IssueOptions::default())
		.await
		.expect("Metadata identity request should succeed.");

	mock.assert_async().await;

	assert_eq!(token.token.expose(), "eyJhbGciOiJSUzI1NiJ9.e30.sig");
}

#[tokio::test]
async fn exchange_rejects_non_metadata_credentials() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path(IDENTITY_PATH);
			then.status(200).body("never");
		})
		.await;
	let credentials = AmbientCredentials {
		access_token: TokenSecret::new("ya29.user"),
		expires_at: None,
		source: CredentialSource::AuthorizedUser,
	};
	let err = build_client(&server)
		.exchange("aud", &credentials, &IssueOptions::default())
		.await
		.expect_err("User credentials cannot mint identity tokens through the metadata server.");

	assert!(matches!(err, Error::Unsupported { .. }), "Unexpected error: {err:?}.");

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn empty_identity_body_is_an_error() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(IDENTITY_PATH);
			then.status(200).body("  \n");
		})
		.await;

	let err = build_client(&server)
		.exchange("aud", &metadata_credentials(), &IssueOptions::default())
		.await
		.expect_err("Blank identity tokens should be rejected.");

	assert!(err.to_string().contains("did not include a token"), "Unexpected error: {err}.");
}

#[tokio::test]
async fn missing_service_account_maps_to_not_found() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(TOKEN_PATH);
			then.status(404).body("service account not found");
		})
		.await;

	let scopes = ScopeSet::new(["cloud-platform"]).expect("Scope fixture should be valid.");
	let err = build_client(&server)
		.ambient_credentials(&scopes, &IssueOptions::default())
		.await
		.expect_err("Missing default service accounts should fail.");

	assert!(matches!(err, Error::NotFound { .. }), "Unexpected error: {err:?}.");
}
