// self
use crate::{_prelude::*, obs::RouteKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedIssue<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedIssue<F> = F;

/// A span builder used by the issuer.
#[derive(Clone, Debug)]
pub struct IssueSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl IssueSpan {
	/// Creates a new span tagged with the provided route + stage.
	pub fn new(route: RouteKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"impersonation_broker.issue",
				route = route.as_str(),
				stage,
				scopes = tracing::field::Empty,
				delegates = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (route, stage);

			Self {}
		}
	}

	/// Records the scope fingerprint for access-token requests.
	pub fn record_scopes(&self, fingerprint: &str) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("scopes", fingerprint);
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = fingerprint;
		}
	}

	/// Records the number of delegation hops.
	pub fn record_delegates(&self, hops: usize) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("delegates", hops);
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = hops;
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedIssue<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn issue_span_noop_without_subscriber() {
		let span = IssueSpan::new(RouteKind::AccessToken, "test");

		span.record_scopes("fingerprint");
		span.record_delegates(2);
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = IssueSpan::new(RouteKind::AmbientIdToken, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
