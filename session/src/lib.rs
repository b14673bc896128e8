pub mod config;
pub mod lifecycle;
pub mod mining;
pub mod notification;
pub mod session;
pub mod store;
pub mod sync;
pub mod world;

pub use session::{Session, SessionError};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// None of the guarded state can be left half-written by a panic, so a poisoned lock is still usable.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
pub(crate) mod testing {
	use crate::world::World;
	use driftward_backend_types::ProfileRecord;
	use driftward_shared::{SectorCoordinate, ShipSpec, WorldState};

	pub fn profile(id: &str, credits: u64) -> ProfileRecord {
		let ship = ShipSpec {
			starting_credits: credits,
			..ShipSpec::default()
		};

		ProfileRecord::capture(id, WorldState::new(&ship).persistent())
	}

	pub fn world() -> World {
		World::new(WorldState::new(&ShipSpec::default()))
	}

	pub fn set_credits(world: &World, credits: u64) {
		world.modify(|state| {
			let mut persistent = state.persistent();
			persistent.credits = credits;
			state.restore(persistent);
		});
	}

	/// Teleports the player, as if a warp had just landed.
	pub fn move_to(world: &World, sector: SectorCoordinate) {
		world.modify(|state| {
			let mut persistent = state.persistent();
			persistent.current_sector = sector;
			state.restore(persistent);
		});
	}
}
