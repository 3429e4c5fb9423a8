// self
use crate::obs::{IssueOutcome, RouteKind};

/// Records an issuance outcome via the global metrics recorder (when enabled).
pub fn record_issue_outcome(route: RouteKind, outcome: IssueOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"impersonation_broker_issue_total",
			"route" => route.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (route, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_issue_outcome_noop_without_recorder() {
		record_issue_outcome(RouteKind::Unresolved, IssueOutcome::Rejected);
	}
}
