//! Issues an identity token from ambient credentials through a local stand-in for the compute
//! metadata server, showing the warning raised for ignored delegates.

// std
use std::sync::Arc;
// crates.io
use color_eyre::{Result, eyre::eyre};
use httpmock::prelude::*;
use url::Url;
// self
use impersonation_broker::{
	client::ReqwestMetadataClient,
	issue::Issuer,
	provider::ProviderDescriptor,
	request::{IdTokenInput, RequestInput},
	validate::FieldValue,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/computeMetadata/v1/instance/service-accounts/default/token")
				.header("metadata-flavor", "Google");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-ambient\",\"expires_in\":3599,\"token_type\":\"Bearer\"}",
			);
		})
		.await;
	let identity_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/computeMetadata/v1/instance/service-accounts/default/identity")
				.header("metadata-flavor", "Google");
			then.status(200).body("eyJhbGciOiJSUzI1NiJ9.eyJleHAiOjE4OTM0NTYwMDB9.demo");
		})
		.await;
	let descriptor =
		ProviderDescriptor::builder().metadata_endpoint(Url::parse(&server.base_url())?).build()?;
	let metadata = Arc::new(ReqwestMetadataClient::new(descriptor));
	let issuer = Issuer::builder()
		.credential_provider(metadata.clone())
		.identity_token_exchanger(metadata)
		.default_timeout(std::time::Duration::from_secs(5))
		.build();
	let input = RequestInput::from(IdTokenInput {
		target_audience: FieldValue::Known("https://svc-abc123-uc.a.run.app".into()),
		delegates: FieldValue::Known(vec!["hop@acme-prod.iam.gserviceaccount.com".into()]),
		..Default::default()
	});
	let issued = issuer.issue(&input).await.map_err(|diagnostics| {
		eyre!(
			"issuance failed: {}",
			diagnostics.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
		)
	})?;

	for warning in issued.warnings.iter() {
		println!("{warning}");
	}

	println!("Issued {} expiring at {:?}.", issued.credential.kind, issued.credential.expires_at);

	token_mock.assert_async().await;
	identity_mock.assert_async().await;

	Ok(())
}
