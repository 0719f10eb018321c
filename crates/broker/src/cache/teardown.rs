//! Scoped teardown.

use std::sync::Arc;

use futures::future::join_all;
use hearth_scope::{Scope, ScopeType, is_ancestor_or_self};
use tokio::time::timeout;

use super::{BrokerCache, CacheKey};
use crate::resource::Lifecycle;
use crate::{CloseError, Service, StoreError};

/// Outcome of one scoped close.
///
/// Per-resource failures never abort a close; they are logged and counted
/// here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloseReport {
	invalidated: usize,
	closed: usize,
	close_failures: usize,
	stopped: usize,
	stop_failures: usize,
	stop_timeouts: usize,
	auto_scopes_pruned: usize,
}

impl CloseReport {
	/// Entries removed from the cache.
	pub fn invalidated(&self) -> usize {
		self.invalidated
	}

	/// Closeable resources closed successfully.
	pub fn closed(&self) -> usize {
		self.closed
	}

	/// Closeable resources whose close failed.
	pub fn close_failures(&self) -> usize {
		self.close_failures
	}

	/// Services that terminated cleanly after being stopped.
	pub fn stopped(&self) -> usize {
		self.stopped
	}

	/// Services that terminated with a failure.
	pub fn stop_failures(&self) -> usize {
		self.stop_failures
	}

	/// Services still running when the shutdown timeout elapsed.
	pub fn stop_timeouts(&self) -> usize {
		self.stop_timeouts
	}

	/// Memoized auto-scope resolutions forgotten.
	pub fn auto_scopes_pruned(&self) -> usize {
		self.auto_scopes_pruned
	}

	/// Returns true if every closed or stopped resource shut down cleanly.
	pub fn is_clean(&self) -> bool {
		self.close_failures == 0 && self.stop_failures == 0 && self.stop_timeouts == 0
	}
}

/// Whether an entry cached at `entry` belongs to the subtree being closed.
///
/// Closing with no scope selects everything. An entry without a scope is only
/// selected by that global close.
fn selects<S: ScopeType>(closing: Option<&Scope<S>>, entry: Option<&Scope<S>>) -> bool {
	match (closing, entry) {
		(None, _) => true,
		(Some(_), None) => false,
		(Some(closing), Some(entry)) => is_ancestor_or_self(entry, closing),
	}
}

impl<S: ScopeType> BrokerCache<S> {
	/// Invalidates and shuts down every resource cached at `scope` or below.
	///
	/// `None` closes everything. Selected entries are removed before any
	/// shutdown runs, so a failing resource is still forgotten. Closeables are
	/// closed synchronously; services are all stopped first and then awaited
	/// concurrently, each bounded by the shutdown timeout.
	///
	/// Memoized auto scopes are kept unless pruning is enabled in the
	/// configuration.
	pub async fn close(&self, scope: Option<&Scope<S>>) -> Result<CloseReport, StoreError> {
		let mut report = CloseReport::default();
		let selected: Vec<CacheKey<S>> = self
			.resources
			.keys()?
			.into_iter()
			.filter(|key| selects(scope, key.scope()))
			.collect();

		let mut services: Vec<(CacheKey<S>, Arc<dyn Service>)> = Vec::new();
		for key in selected {
			let Some(entry) = self.resources.remove(&key)? else {
				continue;
			};
			report.invalidated += 1;
			tracing::debug!(key = %key, "broker.cache.invalidate");

			match entry.lifecycle {
				Lifecycle::Inert => {}
				Lifecycle::Closeable(closer) => match closer.close() {
					Ok(()) => report.closed += 1,
					Err(err) => {
						report.close_failures += 1;
						tracing::error!(key = %key, error = %err, "broker.close.failed");
					}
				},
				Lifecycle::Service(service) => {
					service.stop_async();
					services.push((key, service));
				}
			}
		}

		let wait = self.shutdown_timeout;
		let outcomes = join_all(services.into_iter().map(|(key, service)| async move {
			let outcome = timeout(wait, service.await_terminated()).await;
			(key, outcome)
		}))
		.await;

		for (key, outcome) in outcomes {
			match outcome {
				Ok(Ok(())) => report.stopped += 1,
				Ok(Err(err)) => {
					report.stop_failures += 1;
					tracing::error!(key = %key, error = %err, "broker.close.service_failed");
				}
				Err(_) => {
					report.stop_timeouts += 1;
					tracing::warn!(key = %key, error = %CloseError::Timeout(wait), "broker.close.timeout");
				}
			}
		}

		if self.prune_auto_scopes {
			report.auto_scopes_pruned = self
				.auto_scopes
				.retain(|lookup, resolved| !selects(scope, lookup.scope()) && !selects(scope, Some(resolved)))?;
		}

		tracing::info!(
			scope = %scope.map(ToString::to_string).unwrap_or_else(|| "*".into()),
			invalidated = report.invalidated,
			closed = report.closed,
			stopped = report.stopped,
			clean = report.is_clean(),
			"broker.close"
		);
		Ok(report)
	}
}

#[cfg(test)]
mod tests {
	use hearth_scope::{ScopeInstance, SimpleScopeType};

	use super::*;

	#[test]
	fn selection() {
		let root = Scope::root("root");
		let local = Scope::child(ScopeInstance::new(SimpleScopeType::Local, "l"), [root.clone()]).unwrap();

		assert!(selects::<SimpleScopeType>(None, None));
		assert!(selects(None, Some(&local)));
		assert!(!selects(Some(&root), None));
		assert!(selects(Some(&root), Some(&local)));
		assert!(selects(Some(&local), Some(&local)));
		assert!(!selects(Some(&local), Some(&root)));
	}
}
