#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use url::Url;
// self
use impersonation_broker::{
	client::{
		CredentialProvider, ReqwestImpersonationClient, ReqwestMetadataClient,
		StaticCredentialProvider,
	},
	http::ReqwestHttpClient,
	issue::Issuer,
	oauth::ReqwestTransportErrorMapper,
	provider::ProviderDescriptor,
};

/// Builds a descriptor whose endpoints all point at a local mock server.
pub fn test_descriptor(base: &str) -> ProviderDescriptor {
	let base = Url::parse(base).expect("Mock server base URL should parse.");

	ProviderDescriptor::builder()
		.iam_credentials_endpoint(base.clone())
		.token_endpoint(base.join("token").expect("Mock token endpoint should join."))
		.metadata_endpoint(base)
		.user_agent("impersonation-broker-tests")
		.build()
		.expect("Mock descriptor should build for loopback endpoints.")
}

/// Reqwest transport used across integration tests.
pub fn test_reqwest_http_client() -> ReqwestHttpClient {
	ReqwestHttpClient::without_redirects().expect("Failed to build Reqwest client for tests.")
}

/// Issuer whose IAM client authenticates with `caller_token` and whose ambient route goes
/// through the mock metadata server.
pub fn build_reqwest_test_issuer(descriptor: ProviderDescriptor, caller_token: &str) -> Issuer {
	let credentials: Arc<dyn CredentialProvider> =
		Arc::new(StaticCredentialProvider::new(caller_token));
	let mapper = Arc::new(ReqwestTransportErrorMapper);
	let iam = ReqwestImpersonationClient::with_http_client(
		descriptor.clone(),
		credentials,
		test_reqwest_http_client(),
		mapper.clone(),
	);
	let metadata = Arc::new(ReqwestMetadataClient::with_http_client(
		descriptor,
		test_reqwest_http_client(),
		mapper,
	));

	Issuer::builder()
		.impersonation_client(Arc::new(iam))
		.credential_provider(metadata.clone())
		.identity_token_exchanger(metadata)
		.build()
}
