//! Validates an access-token request, prints its diagnostics, and issues the token against a
//! local stand-in for the IAM Credentials API.

// std
use std::sync::Arc;
// crates.io
use color_eyre::{Result, eyre::eyre};
use httpmock::prelude::*;
use url::Url;
// self
use impersonation_broker::{
	client::{ReqwestImpersonationClient, StaticCredentialProvider},
	issue::Issuer,
	provider::ProviderDescriptor,
	request::{AccessTokenInput, RequestInput},
	validate::FieldValue,
};

const TARGET: &str = "deployer@acme-prod.iam.gserviceaccount.com";

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let iam_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(format!("/v1/projects/-/serviceAccounts/{TARGET}:generateAccessToken"));
			then.status(200).header("content-type", "application/json").body(
				"{\"accessToken\":\"demo-access\",\"expireTime\":\"2030-01-01T00:00:00Z\"}",
			);
		})
		.await;
	let descriptor = ProviderDescriptor::builder()
		.iam_credentials_endpoint(Url::parse(&server.base_url())?)
		.build()?;
	let caller = Arc::new(StaticCredentialProvider::new("demo-caller-token"));
	let issuer = Issuer::builder()
		.impersonation_client(Arc::new(ReqwestImpersonationClient::new(descriptor, caller)))
		.build();
	let input = RequestInput::from(AccessTokenInput {
		target_service_account: FieldValue::Known(TARGET.into()),
		scopes: FieldValue::Known(vec!["cloud-platform".into(), "userinfo-email".into()]),
		lifetime: FieldValue::Known("30m".into()),
		..Default::default()
	});

	for diagnostic in issuer.validate(&input).iter() {
		println!("{diagnostic}");
	}

	let issued = issuer.issue(&input).await.map_err(|diagnostics| {
		eyre!(
			"issuance failed: {}",
			diagnostics.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
		)
	})?;

	println!(
		"Issued {} for {TARGET} (lifetime {:?}, expires {:?}).",
		issued.credential.kind, issued.credential.lifetime, issued.credential.expires_at
	);

	iam_mock.assert_async().await;

	Ok(())
}
