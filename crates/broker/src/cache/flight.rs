//! Single-flight slot map.
//!
//! Published values live in a `RwLock`ed map. A creation in progress is
//! tracked in a separate in-flight map holding a `watch` channel; the first
//! caller for a missing key becomes the leader and runs the creation future,
//! later callers subscribe and receive the leader's outcome.
//!
//! Each task remembers the flights it leads. A leader asking for a slot it is
//! still creating fails with [`BrokerError::RecursiveCreation`] instead of
//! waiting on itself.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use hearth_scope::ScopeType;
use parking_lot::Mutex;
use tokio::sync::watch;

use super::CacheKey;
use crate::{BrokerError, StoreError};

type Outcome<V> = Arc<Result<V, BrokerError>>;

tokio::task_local! {
	/// Addresses of the flights led by the current task, outermost first.
	static LEADING: Vec<usize>;
}

fn flight_id<V>(flight: &Arc<InFlight<V>>) -> usize {
	Arc::as_ptr(flight) as usize
}

fn is_leading<V>(flight: &Arc<InFlight<V>>) -> bool {
	let id = flight_id(flight);
	LEADING.try_with(|ids| ids.contains(&id)).unwrap_or(false)
}

struct InFlight<V> {
	tx: watch::Sender<Option<Outcome<V>>>,
}

pub(super) struct Slots<S: ScopeType, V> {
	published: RwLock<HashMap<CacheKey<S>, V>>,
	in_flight: Mutex<HashMap<CacheKey<S>, Arc<InFlight<V>>>>,
}

impl<S: ScopeType, V: Clone> Slots<S, V> {
	pub(super) fn new() -> Self {
		Self {
			published: RwLock::new(HashMap::new()),
			in_flight: Mutex::new(HashMap::new()),
		}
	}

	pub(super) fn get(&self, key: &CacheKey<S>) -> Result<Option<V>, StoreError> {
		let published = self.published.read().map_err(|_| StoreError::Poisoned)?;
		Ok(published.get(key).cloned())
	}

	/// Returns the published value for `key`, running `create` if there is none.
	///
	/// `create` is only polled when this caller leads the creation. A leader
	/// dropped before finishing reports [`BrokerError::CreationAborted`] to its
	/// waiters and frees the slot.
	pub(super) async fn get_or_try_create<Fut>(&self, key: CacheKey<S>, create: Fut) -> Result<V, BrokerError>
	where
		Fut: Future<Output = Result<V, BrokerError>>,
	{
		if let Some(value) = self.get(&key)? {
			return Ok(value);
		}

		let (flight, leader) = self.join(&key);
		if !leader {
			if is_leading(&flight) {
				tracing::warn!(key = %key, "broker.cache.recursive_create");
				return Err(key.recursive());
			}
			return wait(&flight, &key).await;
		}

		let guard = FlightGuard {
			slots: self,
			key,
			flight,
			completed: false,
		};

		// Another leader may have published between our lookup and the join.
		match self.get(&guard.key) {
			Ok(Some(value)) => return guard.complete(Ok(value)),
			Ok(None) => {}
			Err(err) => return guard.complete(Err(err.into())),
		}

		let mut leading = LEADING.try_with(Clone::clone).unwrap_or_default();
		leading.push(flight_id(&guard.flight));

		let result = match LEADING.scope(leading, create).await {
			Ok(value) => self.publish(&guard.key, value.clone()).map(|()| value).map_err(BrokerError::from),
			Err(err) => Err(err),
		};
		guard.complete(result)
	}

	/// Inserts `value` unless the key is already published.
	pub(super) fn insert_if_absent(&self, key: CacheKey<S>, value: V) -> Result<bool, StoreError> {
		let mut published = self.published.write().map_err(|_| StoreError::Poisoned)?;
		if published.contains_key(&key) {
			return Ok(false);
		}
		published.insert(key, value);
		Ok(true)
	}

	pub(super) fn remove(&self, key: &CacheKey<S>) -> Result<Option<V>, StoreError> {
		let mut published = self.published.write().map_err(|_| StoreError::Poisoned)?;
		Ok(published.remove(key))
	}

	/// Drops every published entry for which `keep` returns false.
	///
	/// Returns the number of dropped entries.
	pub(super) fn retain(&self, mut keep: impl FnMut(&CacheKey<S>, &V) -> bool) -> Result<usize, StoreError> {
		let mut published = self.published.write().map_err(|_| StoreError::Poisoned)?;
		let before = published.len();
		published.retain(|key, value| keep(key, value));
		Ok(before - published.len())
	}

	pub(super) fn keys(&self) -> Result<Vec<CacheKey<S>>, StoreError> {
		let published = self.published.read().map_err(|_| StoreError::Poisoned)?;
		Ok(published.keys().cloned().collect())
	}

	pub(super) fn len(&self) -> Result<usize, StoreError> {
		let published = self.published.read().map_err(|_| StoreError::Poisoned)?;
		Ok(published.len())
	}

	/// Number of creations currently running.
	pub(super) fn pending(&self) -> usize {
		self.in_flight.lock().len()
	}

	fn publish(&self, key: &CacheKey<S>, value: V) -> Result<(), StoreError> {
		let mut published = self.published.write().map_err(|_| StoreError::Poisoned)?;
		published.insert(key.clone(), value);
		Ok(())
	}

	/// Joins the running creation for `key` or registers a new one.
	///
	/// The boolean is true when the caller became the leader.
	fn join(&self, key: &CacheKey<S>) -> (Arc<InFlight<V>>, bool) {
		let mut in_flight = self.in_flight.lock();
		if let Some(flight) = in_flight.get(key) {
			return (Arc::clone(flight), false);
		}
		let (tx, _) = watch::channel(None);
		let flight = Arc::new(InFlight { tx });
		in_flight.insert(key.clone(), Arc::clone(&flight));
		(flight, true)
	}
}

async fn wait<S: ScopeType, V: Clone>(flight: &InFlight<V>, key: &CacheKey<S>) -> Result<V, BrokerError> {
	let mut rx = flight.tx.subscribe();
	loop {
		let outcome = rx.borrow_and_update().clone();
		if let Some(outcome) = outcome {
			return (*outcome).clone();
		}
		if rx.changed().await.is_err() {
			return Err(key.aborted());
		}
	}
}

/// Leader-side handle for one creation.
///
/// Completing (or dropping) the guard removes the in-flight entry before the
/// outcome is sent, so a caller arriving afterwards either sees the published
/// value or starts a fresh creation.
struct FlightGuard<'a, S: ScopeType, V: Clone> {
	slots: &'a Slots<S, V>,
	key: CacheKey<S>,
	flight: Arc<InFlight<V>>,
	completed: bool,
}

impl<S: ScopeType, V: Clone> FlightGuard<'_, S, V> {
	fn complete(mut self, result: Result<V, BrokerError>) -> Result<V, BrokerError> {
		self.completed = true;
		self.finish(Arc::new(result.clone()));
		result
	}

	fn finish(&self, outcome: Outcome<V>) {
		{
			let mut in_flight = self.slots.in_flight.lock();
			if in_flight.get(&self.key).is_some_and(|current| Arc::ptr_eq(current, &self.flight)) {
				in_flight.remove(&self.key);
			}
		}
		self.flight.tx.send_replace(Some(outcome));
	}
}

impl<S: ScopeType, V: Clone> Drop for FlightGuard<'_, S, V> {
	fn drop(&mut self) {
		if !self.completed {
			tracing::warn!(key = %self.key, "broker.cache.create_aborted");
			self.finish(Arc::new(Err(self.key.aborted())));
		}
	}
}
