//! Drives the extraction cycles of the equipped mining lasers.
//!
//! Every laser gets its own task and its own cycle; a second laser doubles the yield rather than sharing a timer.

use crate::notification::Notifier;
use crate::sync::SyncEngine;
use crate::world::{WeakWorld, World};
use driftward_shared::item::MiningLaser;
use driftward_shared::mining::MiningCredit;
use driftward_shared::object::ObjectId;
use log::{debug, info};
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

/// The running cycles of one mining operation. Dropping the rig stops them.
pub struct MiningRig {
	target: ObjectId,
	cycles: Vec<JoinHandle<()>>,
}

impl MiningRig {
	pub fn start(
		world: &World,
		sync: &Arc<SyncEngine>,
		notifier: &Notifier,
		target: ObjectId,
		lasers: Vec<MiningLaser>,
	) -> Self {
		info!("mining {target} with {} lasers", lasers.len());

		let cycles = lasers
			.into_iter()
			.map(|laser| {
				tokio::spawn(run_cycle(
					world.downgrade(),
					Arc::downgrade(sync),
					notifier.clone(),
					target,
					laser,
				))
			})
			.collect();

		Self { target, cycles }
	}

	pub fn target(&self) -> ObjectId {
		self.target
	}

	pub fn is_running(&self) -> bool {
		self.cycles.iter().any(|cycle| !cycle.is_finished())
	}

	pub fn stop(&mut self) {
		for cycle in self.cycles.drain(..) {
			cycle.abort();
		}
	}
}

impl Drop for MiningRig {
	fn drop(&mut self) {
		self.stop();
	}
}

async fn run_cycle(
	world: WeakWorld,
	sync: Weak<SyncEngine>,
	notifier: Notifier,
	target: ObjectId,
	laser: MiningLaser,
) {
	let mut started = Instant::now();

	loop {
		sleep_until(started + laser.cooldown).await;
		if started.elapsed() < laser.cooldown {
			continue;
		}

		let Some(world) = world.upgrade() else {
			return;
		};

		let credit = match world.update(|state| state.credit_mining_yield(target, laser.output)) {
			Ok(credit) => credit,
			Err(error) => {
				debug!("mining cycle on {target} ended: {error}");
				return;
			}
		};

		if credit.amount() > 0 {
			if let Some(sync) = sync.upgrade() {
				sync.schedule_cargo_save();
			}
		}

		match credit {
			MiningCredit::Credited { .. } => started = Instant::now(),
			MiningCredit::Depleted { amount } => {
				notifier.info(format!("Mined {amount} units, the asteroid is depleted"));
				return;
			}
			MiningCredit::CargoFull { amount } => {
				notifier.warn(format!("Mined {amount} units, the cargo hold is full"));
				return;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::notification::Level;
	use crate::store::memory::MemoryStore;
	use crate::sync::SessionInfo;
	use driftward_shared::cargo::Resource;
	use driftward_shared::hangar::{CatalogEntry, Market};
	use driftward_shared::item::{ItemKind, Module, SlotId};
	use driftward_shared::object::{Deposit, ObjectKind};
	use driftward_shared::sector::{SectorResources, SectorType};
	use driftward_shared::{ShipSpec, Status, WorldState, HOME};
	use std::time::Duration;
	use tokio::time::sleep;

	fn market() -> Market {
		let laser = |name: &str, cooldown_ms, output| CatalogEntry {
			name: name.into(),
			price: 0,
			kind: ItemKind::Module(Module::MiningLaser { cooldown_ms, output }),
		};

		Market {
			catalog: vec![laser("fast", 1000, 10), laser("slow", 1500, 5)],
			..Market::default()
		}
	}

	struct Rig {
		world: World,
		sync: Arc<SyncEngine>,
		notifier: Notifier,
		target: ObjectId,
		lasers: Vec<MiningLaser>,
	}

	/// A ship carrying `lasers` sitting next to an iron asteroid of `remaining` units.
	fn rig(lasers: &[(&str, SlotId)], cargo_capacity: u32, remaining: u32) -> Rig {
		let ship = ShipSpec {
			cargo_capacity,
			..ShipSpec::default()
		};
		let world = World::new(WorldState::new(&ship));
		let market = market();

		for (name, slot) in lasers {
			let item = world.update(|state| state.buy(&market, name)).unwrap();
			world.update(|state| state.equip(item, *slot)).unwrap();
		}

		world.update(|state| state.undock()).unwrap();
		world.modify(|state| {
			state.populate_sector(
				HOME,
				SectorType::Station,
				SectorResources {
					iron: remaining,
					..SectorResources::default()
				},
				vec![ObjectKind::Asteroid(Deposit {
					resource: Resource::Iron,
					remaining,
				})],
			);
		});

		let target = world.read().local_objects()[0].id;
		let lasers = world.update(|state| state.start_mining(target)).unwrap();

		let notifier = Notifier::new();
		let sync = SyncEngine::new(
			SessionInfo {
				player: "pilot".into(),
				authenticated: true,
			},
			Arc::new(MemoryStore::new()),
			world.clone(),
			notifier.clone(),
			Duration::from_secs(1),
		);

		Rig {
			world,
			sync,
			notifier,
			target,
			lasers,
		}
	}

	fn iron(world: &World) -> u32 {
		world.read().cargo().get(Resource::Iron)
	}

	#[tokio::test(start_paused = true)]
	async fn each_laser_runs_its_own_cycle() {
		let Rig {
			world,
			sync,
			notifier,
			target,
			lasers,
		} = rig(&[("fast", SlotId::UtilityA), ("slow", SlotId::UtilityB)], 200, 250);
		let _rig = MiningRig::start(&world, &sync, &notifier, target, lasers);

		sleep(Duration::from_millis(1050)).await;
		assert_eq!(iron(&world), 10);

		sleep(Duration::from_millis(500)).await;
		assert_eq!(iron(&world), 15);

		sleep(Duration::from_millis(1500)).await;
		assert_eq!(iron(&world), 40);
		assert_eq!(world.read().status(), Status::Mining);
	}

	#[tokio::test(start_paused = true)]
	async fn yield_is_clipped_to_free_cargo() {
		let Rig {
			world,
			sync,
			notifier,
			target,
			lasers,
		} = rig(&[("fast", SlotId::UtilityA)], 15, 250);
		let mut notifications = notifier.subscribe();
		let rig = MiningRig::start(&world, &sync, &notifier, target, lasers);

		sleep(Duration::from_millis(5050)).await;

		assert_eq!(iron(&world), 15);
		assert_eq!(world.read().status(), Status::Space);
		assert!(!rig.is_running());
		assert_eq!(notifications.try_recv().unwrap().level, Level::Warning);
	}

	#[tokio::test(start_paused = true)]
	async fn depleted_asteroids_disappear() {
		let Rig {
			world,
			sync,
			notifier,
			target,
			lasers,
		} = rig(&[("fast", SlotId::UtilityA)], 200, 25);
		let _rig = MiningRig::start(&world, &sync, &notifier, target, lasers);

		sleep(Duration::from_millis(2050)).await;
		assert_eq!(iron(&world), 20);
		assert_eq!(world.read().sector_resources().iron, 5);

		sleep(Duration::from_millis(1000)).await;
		let world = world.read();
		assert_eq!(world.cargo().get(Resource::Iron), 25);
		assert_eq!(world.sector_resources().iron, 0);
		assert!(world.object(target).is_none());
		assert_eq!(world.status(), Status::Space);
	}

	#[tokio::test(start_paused = true)]
	async fn stopping_cancels_pending_cycles() {
		let Rig {
			world,
			sync,
			notifier,
			target,
			lasers,
		} = rig(&[("fast", SlotId::UtilityA)], 200, 250);
		let mut rig = MiningRig::start(&world, &sync, &notifier, target, lasers);

		sleep(Duration::from_millis(1500)).await;
		rig.stop();
		world.update(|state| state.stop_mining()).unwrap();
		sleep(Duration::from_secs(10)).await;

		assert_eq!(iron(&world), 10);
	}

	#[tokio::test(start_paused = true)]
	async fn cycles_do_nothing_once_the_world_is_gone() {
		let Rig {
			world,
			sync,
			notifier,
			target,
			lasers,
		} = rig(&[("fast", SlotId::UtilityA)], 200, 250);
		let observer = world.subscribe();
		let rig = MiningRig::start(&world, &sync, &notifier, target, lasers);
		drop((world, sync));

		sleep(Duration::from_millis(1050)).await;

		assert_eq!(observer.borrow().cargo().get(Resource::Iron), 0);
		assert!(!rig.is_running());
	}
}
