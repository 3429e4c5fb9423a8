//! Credential request model and its assembly from raw field values.
//!
//! Assembly runs every registered field validator, then the field contract (required
//! attributes, known values, non-empty scope sets). All diagnostics are aggregated; a
//! [`CredentialRequest`] only exists when none of them is an error. The issuance route is
//! decided here, once, and carried as [`IssuanceRoute`].

mod lifetime;

pub use lifetime::*;

// std
use std::slice::Iter;
// self
use crate::{
	_prelude::*,
	auth::{CredentialKind, ScopeSet, ServiceAccount},
	obs::RouteKind,
	validate::{self, Diagnostics, FieldId, FieldValue},
};

/// Summary for omitted required attributes.
pub const MISSING_REQUIRED_ATTRIBUTE: &str = "Missing Required Attribute";
/// Summary for values that are still unknown at issue time.
pub const VALUE_NOT_YET_KNOWN: &str = "Value Not Yet Known";
/// Summary for unusable scope sets.
pub const INVALID_SCOPES: &str = "Invalid Scopes";
/// Summary for delegates supplied on a route that cannot use them.
pub const DELEGATES_IGNORED: &str = "Delegates Ignored";

/// Ordered delegation chain, first hop to last.
///
/// Order is preserved verbatim from the request to the downstream call; entries are neither
/// sorted nor deduplicated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DelegationChain(Vec<ServiceAccount>);
impl DelegationChain {
	/// Creates a chain from validated identities.
	pub fn new(hops: impl IntoIterator<Item = ServiceAccount>) -> Self {
		Self(hops.into_iter().collect())
	}

	/// Number of hops.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true when no delegates were supplied.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterator over hops in order.
	pub fn iter(&self) -> Iter<'_, ServiceAccount> {
		self.0.iter()
	}

	/// Hops rendered as strings, in order.
	pub fn to_strings(&self) -> Vec<String> {
		self.0.iter().map(ToString::to_string).collect()
	}
}
impl<'a> IntoIterator for &'a DelegationChain {
	type IntoIter = Iter<'a, ServiceAccount>;
	type Item = &'a ServiceAccount;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}

/// Which downstream protocol a request takes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IssuanceRoute {
	/// `generateAccessToken` against the target.
	AccessToken {
		/// Identity to impersonate.
		target: ServiceAccount,
		/// Canonicalized scopes.
		scopes: ScopeSet,
		/// Effective lifetime.
		lifetime: Lifetime,
	},
	/// `generateIdToken` against the target.
	ImpersonatedIdToken {
		/// Identity to impersonate.
		target: ServiceAccount,
		/// Audience claim.
		audience: String,
		/// Whether to include the `email` claim.
		include_email: bool,
	},
	/// Identity token minted from the caller's own ambient credentials.
	AmbientIdToken {
		/// Audience claim.
		audience: String,
	},
}
impl IssuanceRoute {
	/// Observability label.
	pub fn kind(&self) -> RouteKind {
		match self {
			Self::AccessToken { .. } => RouteKind::AccessToken,
			Self::ImpersonatedIdToken { .. } => RouteKind::ImpersonatedIdToken,
			Self::AmbientIdToken { .. } => RouteKind::AmbientIdToken,
		}
	}

	/// Credential kind produced by the route.
	pub fn credential_kind(&self) -> CredentialKind {
		match self {
			Self::AccessToken { .. } => CredentialKind::AccessToken,
			Self::ImpersonatedIdToken { .. } | Self::AmbientIdToken { .. } =>
				CredentialKind::IdentityToken,
		}
	}
}

/// Validated, typed issuance request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialRequest {
	/// Selected route and its route-specific fields.
	pub route: IssuanceRoute,
	/// Delegation chain; empty when not supplied.
	pub delegates: DelegationChain,
}
impl CredentialRequest {
	/// Access-token request with no delegates.
	pub fn access_token(target: ServiceAccount, scopes: ScopeSet, lifetime: Lifetime) -> Self {
		Self {
			route: IssuanceRoute::AccessToken { target, scopes, lifetime },
			delegates: DelegationChain::default(),
		}
	}

	/// Identity-token request; `target = None` selects the ambient route.
	pub fn id_token(
		target: Option<ServiceAccount>,
		audience: impl Into<String>,
		include_email: bool,
	) -> Self {
		let audience = audience.into();
		let route = match target {
			Some(target) => IssuanceRoute::ImpersonatedIdToken { target, audience, include_email },
			None => IssuanceRoute::AmbientIdToken { audience },
		};

		Self { route, delegates: DelegationChain::default() }
	}

	/// Replaces the delegation chain.
	pub fn with_delegates(mut self, delegates: DelegationChain) -> Self {
		self.delegates = delegates;

		self
	}

	/// Target identity, when the route impersonates one.
	pub fn target(&self) -> Option<&ServiceAccount> {
		match &self.route {
			IssuanceRoute::AccessToken { target, .. }
			| IssuanceRoute::ImpersonatedIdToken { target, .. } => Some(target),
			IssuanceRoute::AmbientIdToken { .. } => None,
		}
	}

	/// Audience, for identity-token routes.
	pub fn audience(&self) -> Option<&str> {
		match &self.route {
			IssuanceRoute::ImpersonatedIdToken { audience, .. }
			| IssuanceRoute::AmbientIdToken { audience } => Some(audience),
			IssuanceRoute::AccessToken { .. } => None,
		}
	}

	/// Scopes, for the access-token route.
	pub fn scopes(&self) -> Option<&ScopeSet> {
		match &self.route {
			IssuanceRoute::AccessToken { scopes, .. } => Some(scopes),
			_ => None,
		}
	}

	/// Lifetime, for the access-token route.
	pub fn lifetime(&self) -> Option<Lifetime> {
		match &self.route {
			IssuanceRoute::AccessToken { lifetime, .. } => Some(*lifetime),
			_ => None,
		}
	}
}

/// Raw access-token fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessTokenInput {
	/// Required identity to impersonate.
	pub target_service_account: FieldValue<String>,
	/// Required scope list.
	pub scopes: FieldValue<Vec<String>>,
	/// Optional delegation chain.
	pub delegates: FieldValue<Vec<String>>,
	/// Optional lifetime expression; defaults to `3600s`.
	pub lifetime: FieldValue<String>,
}

/// Raw identity-token fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdTokenInput {
	/// Required audience.
	pub target_audience: FieldValue<String>,
	/// Optional identity to impersonate; omitted selects the ambient route.
	pub target_service_account: FieldValue<String>,
	/// Optional delegation chain.
	pub delegates: FieldValue<Vec<String>>,
	/// Optional email claim toggle; defaults to `false`.
	pub include_email: FieldValue<bool>,
}

/// Raw request as received from the calling framework.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestInput {
	/// Access-token flow.
	AccessToken(AccessTokenInput),
	/// Identity-token flow.
	IdToken(IdTokenInput),
}
impl RequestInput {
	/// Runs every validator and the field contract, producing a request or all errors.
	pub fn assemble(&self) -> Result<Assembled, Diagnostics> {
		let mut out = Diagnostics::new();
		let request = match self {
			Self::AccessToken(input) => input.assemble(&mut out),
			Self::IdToken(input) => input.assemble(&mut out),
		};

		match request {
			Some(request) if !out.has_error() => Ok(Assembled { request, warnings: out }),
			_ => Err(out),
		}
	}

	/// Credential kind the flow produces.
	pub fn credential_kind(&self) -> CredentialKind {
		match self {
			Self::AccessToken(_) => CredentialKind::AccessToken,
			Self::IdToken(_) => CredentialKind::IdentityToken,
		}
	}
}
impl From<AccessTokenInput> for RequestInput {
	fn from(value: AccessTokenInput) -> Self {
		Self::AccessToken(value)
	}
}
impl From<IdTokenInput> for RequestInput {
	fn from(value: IdTokenInput) -> Self {
		Self::IdToken(value)
	}
}

/// Successfully assembled request plus the non-blocking diagnostics it produced.
#[derive(Clone, Debug)]
pub struct Assembled {
	/// Validated request.
	pub request: CredentialRequest,
	/// Warnings recorded during assembly.
	pub warnings: Diagnostics,
}

impl AccessTokenInput {
	fn assemble(&self, out: &mut Diagnostics) -> Option<CredentialRequest> {
		let target_field = FieldId::TargetServiceAccount;

		out.append(validate::validate_field(
			target_field,
			&target_field.path(),
			self.target_service_account.as_deref(),
		));
		validate::validate_field_elements(FieldId::Scopes, self.scopes.as_slice(), out);
		validate::validate_field_elements(FieldId::Delegates, self.delegates.as_slice(), out);
		out.append(validate::validate_field(
			FieldId::Lifetime,
			&FieldId::Lifetime.path(),
			self.lifetime.as_deref(),
		));

		let target = required(target_field, self.target_service_account.as_ref(), out)
			.and_then(|value| ServiceAccount::new(value).ok());
		let scopes = required(FieldId::Scopes, self.scopes.as_ref(), out)
			.and_then(|values| scope_set(values, out));
		let delegates = delegation_chain(&self.delegates, out);
		let lifetime = match &self.lifetime {
			FieldValue::Null => Some(Lifetime::DEFAULT),
			FieldValue::Unknown => {
				unknown(FieldId::Lifetime, out);

				None
			},
			FieldValue::Known(value) => Lifetime::parse(value),
		};

		Some(CredentialRequest::access_token(target?, scopes?, lifetime?).with_delegates(delegates?))
	}
}

impl IdTokenInput {
	fn assemble(&self, out: &mut Diagnostics) -> Option<CredentialRequest> {
		let target_field = FieldId::TargetServiceAccount;

		out.append(validate::validate_field(
			target_field,
			&target_field.path(),
			self.target_service_account.as_deref(),
		));
		validate::validate_field_elements(FieldId::Delegates, self.delegates.as_slice(), out);

		let audience = required(FieldId::TargetAudience, self.target_audience.as_ref(), out);
		let target = match &self.target_service_account {
			FieldValue::Null => Some(None),
			FieldValue::Unknown => {
				unknown(target_field, out);

				None
			},
			FieldValue::Known(value) => ServiceAccount::new(value).ok().map(Some),
		};
		let delegates = delegation_chain(&self.delegates, out);
		let include_email = match self.include_email {
			FieldValue::Null => Some(false),
			FieldValue::Unknown => {
				unknown(FieldId::IncludeEmail, out);

				None
			},
			FieldValue::Known(value) => Some(value),
		};
		let (audience, target, delegates, include_email) =
			(audience?, target?, delegates?, include_email?);

		if target.is_none() && !delegates.is_empty() {
			out.add_warning(
				FieldId::Delegates.path(),
				DELEGATES_IGNORED,
				"Delegates only apply when target_service_account is set; the identity token is \
				 issued for the caller's own credentials",
			);
		}

		let request = CredentialRequest::id_token(target, audience.as_str(), include_email);

		if matches!(request.route, IssuanceRoute::AmbientIdToken { .. }) {
			Some(request)
		} else {
			Some(request.with_delegates(delegates))
		}
	}
}

fn required<'a, T>(
	field: FieldId,
	value: FieldValue<&'a T>,
	out: &mut Diagnostics,
) -> Option<&'a T> {
	match value {
		FieldValue::Known(value) => Some(value),
		FieldValue::Null => {
			out.add_error(
				field.path(),
				MISSING_REQUIRED_ATTRIBUTE,
				format!("The argument \"{field}\" is required, but no value was supplied"),
			);

			None
		},
		FieldValue::Unknown => {
			unknown(field, out);

			None
		},
	}
}

fn unknown(field: FieldId, out: &mut Diagnostics) {
	out.add_error(
		field.path(),
		VALUE_NOT_YET_KNOWN,
		format!("The argument \"{field}\" must be known before a credential can be issued"),
	);
}

fn scope_set(values: &[String], out: &mut Diagnostics) -> Option<ScopeSet> {
	if values.is_empty() {
		out.add_error(FieldId::Scopes.path(), INVALID_SCOPES, "At least one scope is required");

		return None;
	}

	match ScopeSet::new(values) {
		Ok(scopes) => Some(scopes),
		Err(err) => {
			out.add_error(FieldId::Scopes.path(), INVALID_SCOPES, err.to_string());

			None
		},
	}
}

fn delegation_chain(
	value: &FieldValue<Vec<String>>,
	out: &mut Diagnostics,
) -> Option<DelegationChain> {
	match value {
		FieldValue::Null => Some(DelegationChain::default()),
		FieldValue::Unknown => {
			unknown(FieldId::Delegates, out);

			None
		},
		FieldValue::Known(values) => values
			.iter()
			.map(|value| ServiceAccount::new(value).ok())
			.collect::<Option<Vec<_>>>()
			.map(DelegationChain),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const TARGET: &str = "deployer@acme-prod.iam.gserviceaccount.com";
	const HOP_A: &str = "hop-a@acme-prod.iam.gserviceaccount.com";
	const HOP_B: &str = "hop-b@acme-prod.iam.gserviceaccount.com";

	fn access_input() -> AccessTokenInput {
		AccessTokenInput {
			target_service_account: FieldValue::Known(TARGET.into()),
			scopes: FieldValue::Known(vec!["cloud-platform".into()]),
			..Default::default()
		}
	}

	fn summaries(diagnostics: &Diagnostics) -> Vec<(String, String)> {
		diagnostics.iter().map(|d| (d.path.to_string(), d.summary.clone())).collect()
	}

	#[test]
	fn access_token_defaults_lifetime_and_canonicalizes_scopes() {
		let assembled = RequestInput::from(access_input())
			.assemble()
			.expect("Access-token input should assemble.");
		let request = assembled.request;

		assert_eq!(request.lifetime().map(Lifetime::to_api_string).as_deref(), Some("3600s"));
		assert_eq!(
			request.scopes().map(ScopeSet::to_vec),
			Some(vec!["https://www.googleapis.com/auth/cloud-platform".to_owned()])
		);
		assert_eq!(request.target().map(ToString::to_string).as_deref(), Some(TARGET));
		assert_eq!(assembled.warnings.warning_count(), 1);
		assert!(!assembled.warnings.has_error());
	}

	#[test]
	fn access_token_aggregates_every_error() {
		let input = AccessTokenInput {
			target_service_account: FieldValue::Known("test".into()),
			scopes: FieldValue::Known(Vec::new()),
			delegates: FieldValue::Known(vec![HOP_A.into(), "nope".into()]),
			lifetime: FieldValue::Known("2h".into()),
		};
		let diagnostics =
			RequestInput::from(input).assemble().expect_err("Invalid input should be rejected.");

		assert_eq!(
			summaries(&diagnostics),
			vec![
				("target_service_account".into(), "Invalid Service Account Name".into()),
				("delegates[1]".into(), "Invalid Service Account Name".into()),
				("lifetime".into(), "Duration Too Long".into()),
				("scopes".into(), INVALID_SCOPES.into()),
			]
		);
	}

	#[test]
	fn access_token_requires_target_and_scopes() {
		let diagnostics = RequestInput::from(AccessTokenInput::default())
			.assemble()
			.expect_err("Empty input should be rejected.");

		assert_eq!(
			summaries(&diagnostics),
			vec![
				("target_service_account".into(), MISSING_REQUIRED_ATTRIBUTE.into()),
				("scopes".into(), MISSING_REQUIRED_ATTRIBUTE.into()),
			]
		);
	}

	#[test]
	fn unknown_values_block_assembly() {
		let input = AccessTokenInput { lifetime: FieldValue::Unknown, ..access_input() };
		let diagnostics =
			RequestInput::from(input).assemble().expect_err("Unknown lifetime should be rejected.");

		assert_eq!(summaries(&diagnostics), vec![
			("scopes[0]".into(), "Non-canonical service scope".into()),
			("lifetime".into(), VALUE_NOT_YET_KNOWN.into()),
		]);
	}

	#[test]
	fn empty_scope_entries_are_rejected_after_validation() {
		let input = AccessTokenInput {
			scopes: FieldValue::Known(vec![String::new()]),
			..access_input()
		};
		let diagnostics =
			RequestInput::from(input).assemble().expect_err("Empty scope should be rejected.");

		assert_eq!(summaries(&diagnostics), vec![("scopes".into(), INVALID_SCOPES.into())]);
	}

	#[test]
	fn delegate_order_is_preserved() {
		let input = AccessTokenInput {
			delegates: FieldValue::Known(vec![HOP_B.into(), HOP_A.into(), HOP_B.into()]),
			..access_input()
		};
		let request = RequestInput::from(input)
			.assemble()
			.expect("Input with delegates should assemble.")
			.request;

		assert_eq!(request.delegates.to_strings(), vec![HOP_B, HOP_A, HOP_B]);
	}

	#[test]
	fn id_token_route_follows_target_presence() {
		let impersonated = IdTokenInput {
			target_audience: FieldValue::Known("https://svc.example.com".into()),
			target_service_account: FieldValue::Known(TARGET.into()),
			delegates: FieldValue::Known(vec![HOP_A.into()]),
			include_email: FieldValue::Known(true),
		};
		let request = RequestInput::from(impersonated.clone())
			.assemble()
			.expect("Impersonated id-token input should assemble.")
			.request;

		assert_eq!(request.route.kind(), RouteKind::ImpersonatedIdToken);
		assert_eq!(request.delegates.to_strings(), vec![HOP_A]);

		let ambient = IdTokenInput { target_service_account: FieldValue::Null, ..impersonated };
		let assembled =
			RequestInput::from(ambient).assemble().expect("Ambient id-token input should assemble.");

		assert_eq!(
			assembled.request.route,
			IssuanceRoute::AmbientIdToken { audience: "https://svc.example.com".into() }
		);
		assert!(assembled.request.delegates.is_empty());
		assert_eq!(
			summaries(&assembled.warnings),
			vec![("delegates".into(), DELEGATES_IGNORED.into())]
		);
	}

	#[test]
	fn id_token_requires_audience_and_validates_target() {
		let input = IdTokenInput {
			target_service_account: FieldValue::Known(String::new()),
			..Default::default()
		};
		let diagnostics =
			RequestInput::from(input).assemble().expect_err("Invalid input should be rejected.");

		assert_eq!(
			summaries(&diagnostics),
			vec![
				("target_service_account".into(), "Invalid Service Account Name".into()),
				("target_audience".into(), MISSING_REQUIRED_ATTRIBUTE.into()),
			]
		);
	}
}
