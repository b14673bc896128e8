//! The operations the presentation layer can invoke, and the timers they start.
//!
//! Each operation is validated and applied by the world in one step. A rejected operation changes nothing; the
//! reason goes out as a warning notification as well as being returned.

use crate::config::Config;
use crate::lifecycle::{Entry, SectorLifecycle};
use crate::lock;
use crate::mining::MiningRig;
use crate::notification::{Notification, Notifier};
use crate::store::{ProfileStore, SectorStore};
use crate::sync::{SaveOutcome, SaveReason, SessionInfo, SyncEngine, SyncError};
use crate::world::World;
use driftward_shared::cargo::Resource;
use driftward_shared::combat::{AttackOutcome, FleeOutcome};
use driftward_shared::item::{ItemId, SlotId};
use driftward_shared::navigation::Course;
use driftward_shared::object::{LootContainer, ObjectId};
use driftward_shared::{InvariantViolation, SectorCoordinate, Status, WorldError, WorldState, HOME};
use log::{debug, info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio::{task::JoinHandle, time::sleep};

#[derive(Debug, Error)]
#[error(transparent)]
pub enum SessionError {
	World(#[from] WorldError),
	Sync(#[from] SyncError),
}

pub struct Session {
	config: Config,
	world: World,
	notifier: Notifier,
	sync: Arc<SyncEngine>,
	lifecycle: SectorLifecycle,
	rng: Mutex<StdRng>,

	mining: Mutex<Option<MiningRig>>,
	warp: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
	pub fn new(
		info: SessionInfo,
		config: Config,
		profiles: Arc<dyn ProfileStore>,
		sectors: Arc<dyn SectorStore>,
	) -> Arc<Self> {
		let world = World::new(WorldState::new(&config.ship));
		let notifier = Notifier::new();
		let sync = SyncEngine::new(
			info,
			profiles,
			world.clone(),
			notifier.clone(),
			config.saving.cargo_debounce(),
		);

		let mut rng = match config.seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_entropy(),
		};
		let lifecycle = SectorLifecycle::new(
			sectors,
			world.clone(),
			sync.clone(),
			notifier.clone(),
			config.encounters.clone(),
			StdRng::seed_from_u64(rng.gen()),
		);

		Arc::new(Self {
			config,
			world,
			notifier,
			sync,
			lifecycle,
			rng: Mutex::new(rng),
			mining: Mutex::new(None),
			warp: Mutex::new(None),
		})
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn state(&self) -> watch::Ref<'_, WorldState> {
		self.world.read()
	}

	pub fn observe(&self) -> watch::Receiver<WorldState> {
		self.world.subscribe()
	}

	pub fn notifications(&self) -> broadcast::Receiver<Notification> {
		self.notifier.subscribe()
	}

	/// Loads the profile and initializes whichever sector it left the player in.
	pub async fn start(&self) -> Result<Entry, SessionError> {
		self.sync.load().await?;
		Ok(self.refresh().await)
	}

	/// Asks for the current sector to be initialized. Does nothing if it already was.
	pub async fn refresh(&self) -> Entry {
		let sector = self.world.read().current_sector();
		self.lifecycle.enter_sector(sector).await
	}

	pub async fn save(&self) -> Result<SaveOutcome, SessionError> {
		Ok(self.sync.save(SaveReason::Manual).await?)
	}

	fn act<T>(&self, operation: impl FnOnce(&mut WorldState) -> Result<T, WorldError>) -> Result<T, SessionError> {
		self.world.update(operation).map_err(|error| {
			debug!("rejected: {error}");
			self.notifier.warn(error.to_string());
			error.into()
		})
	}

	pub fn open_map(&self) -> Result<(), SessionError> {
		self.act(WorldState::open_map)
	}

	pub fn close_map(&self) -> Result<(), SessionError> {
		self.act(WorldState::close_map)
	}

	pub fn plot_course(&self, destination: SectorCoordinate) -> Result<Course, SessionError> {
		self.act(|world| world.plot_course(destination))
	}

	/// Pays for the plotted hop and starts the countdown to arrival. Returns the fuel spent.
	pub fn start_warp(self: &Arc<Self>) -> Result<u32, SessionError> {
		let fuel = self.act(|world| world.begin_warp(self.config.travel.fuel_per_sector))?;
		let duration = self.config.travel.warp_duration();

		if let Some(target) = self.world.read().target_sector() {
			info!("warping to {target}, arriving in {duration:?}");
		}

		let session = Arc::downgrade(self);
		let timer = tokio::spawn(async move {
			sleep(duration).await;

			if let Some(session) = session.upgrade() {
				lock(&session.warp).take();
				// already reported
				let _ = session.complete_warp().await;
			}
		});

		if let Some(previous) = lock(&self.warp).replace(timer) {
			previous.abort();
		}

		Ok(fuel)
	}

	/// Lands the current hop, initializes the new sector and, with autopilot on, sets off on the next hop.
	pub async fn complete_warp(self: &Arc<Self>) -> Result<SectorCoordinate, SessionError> {
		if let Some(timer) = lock(&self.warp).take() {
			timer.abort();
		}

		let next = self.act(|world| match world.status() {
			Status::Warping => world.complete_warp(),
			actual => Err(InvariantViolation::Status { actual }.into()),
		})?;

		let arrived = self.world.read().current_sector();
		self.notifier.info(format!("Arrived at sector {arrived}"));
		self.lifecycle.enter_sector(arrived).await;

		if let Some(next) = next {
			match self.config.travel.autopilot {
				true => {
					if let Err(error) = self.start_warp() {
						warn!("autopilot stopped at {arrived} on the way to {next}: {error}");
					}
				}
				false => self.notifier.info(format!("Next hop to {next} is plotted")),
			}
		}

		Ok(arrived)
	}

	pub fn dock(&self) -> Result<(), SessionError> {
		self.act(WorldState::dock)?;
		self.sync.request_save(SaveReason::Hangar);
		Ok(())
	}

	pub fn undock(&self) -> Result<(), SessionError> {
		self.act(WorldState::undock)
	}

	/// A hangar transaction, saved as soon as it succeeds.
	fn trade<T>(&self, operation: impl FnOnce(&mut WorldState) -> Result<T, WorldError>) -> Result<T, SessionError> {
		let result = self.act(operation)?;
		self.sync.request_save(SaveReason::Hangar);
		Ok(result)
	}

	pub fn equip(&self, item: ItemId, slot: SlotId) -> Result<(), SessionError> {
		self.trade(|world| world.equip(item, slot))
	}

	pub fn unequip(&self, slot: SlotId) -> Result<(), SessionError> {
		self.trade(|world| world.unequip(slot))
	}

	pub fn buy(&self, name: &str) -> Result<ItemId, SessionError> {
		self.trade(|world| world.buy(&self.config.market, name))
	}

	pub fn sell(&self, resource: Resource, quantity: u32) -> Result<u64, SessionError> {
		self.trade(|world| world.sell(&self.config.market, resource, quantity))
	}

	pub fn sell_item(&self, item: ItemId) -> Result<u64, SessionError> {
		self.trade(|world| world.sell_item(&self.config.market, item))
	}

	pub fn repair(&self) -> Result<u32, SessionError> {
		self.trade(|world| world.repair(&self.config.market))
	}

	pub fn refuel(&self) -> Result<u32, SessionError> {
		self.trade(|world| world.refuel(&self.config.market))
	}

	pub fn engage(&self, id: ObjectId) -> Result<(), SessionError> {
		self.act(|world| world.engage(id))
	}

	pub async fn attack(&self) -> Result<AttackOutcome, SessionError> {
		let damage = {
			let world = self.world.read();
			self.config.combat.roll_damage(&world, &mut *lock(&self.rng))
		};

		let outcome = self.act(|world| world.attack(damage, &self.config.combat))?;
		match &outcome {
			AttackOutcome::Exchanged {
				dealt,
				taken,
				enemy_hp,
				hull,
			} => self.notifier.info(format!(
				"Hit for {dealt}, enemy has {enemy_hp} left. Took {taken}, hull at {hull}"
			)),
			AttackOutcome::Victory { enemy, .. } => self.notifier.info(format!("{enemy} destroyed")),
			AttackOutcome::Defeat { .. } => self.defeated().await,
		}

		Ok(outcome)
	}

	pub async fn flee(&self) -> Result<FleeOutcome, SessionError> {
		let escaped = self.config.combat.roll_flee(&mut *lock(&self.rng));

		let outcome = self.act(|world| world.flee(escaped, &self.config.combat))?;
		match &outcome {
			FleeOutcome::Escaped => self.notifier.info("Escaped"),
			FleeOutcome::Caught { taken, hull } => {
				self.notifier.warn(format!("Failed to escape, took {taken}, hull at {hull}"))
			}
			FleeOutcome::Defeat { .. } => self.defeated().await,
		}

		Ok(outcome)
	}

	async fn defeated(&self) {
		info!("{} was defeated", self.sync.session().player);
		self.notifier.warn("Your ship was destroyed and towed back to the station");
		self.stop_rig();
		self.lifecycle.enter_sector(HOME).await;
		self.sync.request_save(SaveReason::Hangar);
	}

	/// Starts every equipped laser on `target`, returning how many there are.
	pub fn start_mining(&self, target: ObjectId) -> Result<usize, SessionError> {
		let lasers = self.act(|world| world.start_mining(target))?;
		let count = lasers.len();

		let rig = MiningRig::start(&self.world, &self.sync, &self.notifier, target, lasers);
		*lock(&self.mining) = Some(rig);

		Ok(count)
	}

	pub fn stop_mining(&self) -> Result<(), SessionError> {
		self.act(WorldState::stop_mining)?;
		self.stop_rig();
		Ok(())
	}

	fn stop_rig(&self) {
		if let Some(mut rig) = lock(&self.mining).take() {
			debug!("stopping mining of {}", rig.target());
			rig.stop();
		}
	}

	pub fn open_container(&self, id: ObjectId) -> Result<(), SessionError> {
		self.act(|world| world.open_container(id))
	}

	/// Claims what fits of the loot container. Returns what was taken.
	pub fn take_loot(&self) -> Result<LootContainer, SessionError> {
		let taken = self.act(WorldState::take_loot)?;
		if !taken.resources.is_empty() || !taken.items.is_empty() || taken.credits > 0 {
			self.sync.schedule_cargo_save();
		}
		Ok(taken)
	}
}

impl Drop for Session {
	fn drop(&mut self) {
		if let Some(timer) = lock(&self.warp).take() {
			timer.abort();
		}
	}
}
