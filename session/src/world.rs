use driftward_shared::WorldState;
use std::sync::{Arc, Weak};
use tokio::sync::watch;

/// The session's single [`WorldState`], observable by the presentation layer.
///
/// Every write is one synchronous call, so no other task can observe or interleave with a half-finished update.
#[derive(Clone)]
pub struct World(Arc<watch::Sender<WorldState>>);

/// A handle held by timers, which must not keep a finished session alive.
#[derive(Clone)]
pub struct WeakWorld(Weak<watch::Sender<WorldState>>);

impl World {
	pub fn new(state: WorldState) -> Self {
		Self(Arc::new(watch::channel(state).0))
	}

	pub fn read(&self) -> watch::Ref<'_, WorldState> {
		self.0.borrow()
	}

	pub fn subscribe(&self) -> watch::Receiver<WorldState> {
		self.0.subscribe()
	}

	/// Runs `operation` against the state. Observers are only woken if it succeeds; operations never write before
	/// they have validated, so a failed operation leaves the state untouched.
	pub fn update<T, E>(&self, operation: impl FnOnce(&mut WorldState) -> Result<T, E>) -> Result<T, E> {
		let mut result = None;
		self.0.send_if_modified(|state| {
			let outcome = operation(state);
			let modified = outcome.is_ok();
			result = Some(outcome);
			modified
		});

		// send_if_modified always runs the closure
		match result {
			Some(result) => result,
			None => unreachable!(),
		}
	}

	/// For writes that cannot fail.
	pub fn modify(&self, operation: impl FnOnce(&mut WorldState)) {
		self.0.send_modify(operation);
	}

	pub fn downgrade(&self) -> WeakWorld {
		WeakWorld(Arc::downgrade(&self.0))
	}
}

impl WeakWorld {
	pub fn upgrade(&self) -> Option<World> {
		self.0.upgrade().map(World)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use driftward_shared::{ShipSpec, Status};

	#[tokio::test]
	async fn failed_operations_do_not_wake_observers() {
		let world = World::new(WorldState::new(&ShipSpec::default()));
		let mut observer = world.subscribe();

		assert!(world.update(|state| state.open_map()).is_err());
		assert!(!observer.has_changed().unwrap());

		world.update(|state| state.undock()).unwrap();
		assert!(observer.has_changed().unwrap());
		assert_eq!(observer.borrow_and_update().status(), Status::Space);
	}

	#[test]
	fn weak_handles_do_not_keep_the_world_alive() {
		let world = World::new(WorldState::new(&ShipSpec::default()));
		let weak = world.downgrade();
		assert!(weak.upgrade().is_some());

		drop(world);
		assert!(weak.upgrade().is_none());
	}
}
