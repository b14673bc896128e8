//! Initializes each sector the player arrives in, exactly once per arrival.
//!
//! The presentation layer may ask for the same sector many times (remounts, refocus), so the manager remembers the
//! last sector it admitted and ignores repeats. The latch is only ever overwritten by a different sector, never
//! released, and a failed initialization still holds it so a broken network cannot cause a retry storm.

use crate::lock;
use crate::notification::Notifier;
use crate::store::{SectorStore, StoreError};
use crate::sync::{SaveReason, SyncEngine};
use crate::world::World;
use driftward_backend_types::SectorRecord;
use driftward_shared::sector::{scan, EncounterTable, Sector};
use driftward_shared::SectorCoordinate;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};
use std::sync::{Arc, Mutex};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Entry {
	Initialized,
	/// The sector was the last one admitted, nothing was done
	AlreadyInitialized,
}

pub struct SectorLifecycle {
	player: Box<str>,
	store: Arc<dyn SectorStore>,
	world: World,
	sync: Arc<SyncEngine>,
	notifier: Notifier,
	encounters: EncounterTable,
	rng: Mutex<StdRng>,

	last_initialized: Mutex<Option<SectorCoordinate>>,
	scans: AtomicUsize,
}

impl SectorLifecycle {
	pub fn new(
		store: Arc<dyn SectorStore>,
		world: World,
		sync: Arc<SyncEngine>,
		notifier: Notifier,
		encounters: EncounterTable,
		rng: StdRng,
	) -> Self {
		Self {
			player: sync.session().player.clone(),
			store,
			world,
			sync,
			notifier,
			encounters,
			rng: Mutex::new(rng),
			last_initialized: Mutex::new(None),
			scans: AtomicUsize::new(0),
		}
	}

	/// How many scans have populated the local objects so far.
	pub fn scans(&self) -> usize {
		self.scans.load(Relaxed)
	}

	pub async fn enter_sector(&self, sector: SectorCoordinate) -> Entry {
		{
			let mut last_initialized = lock(&self.last_initialized);
			if *last_initialized == Some(sector) {
				debug!("sector {sector} already initialized");
				return Entry::AlreadyInitialized;
			}
			*last_initialized = Some(sector);
		}

		info!("entering sector {sector}");

		let mut newly_visited = false;
		self.world.modify(|world| newly_visited = world.mark_visited(sector));
		if newly_visited {
			self.sync.dispatch_visited_update();
		}

		match self.resolve(sector).await {
			Ok(record) => self.populate(sector, &record),
			Err(error) => {
				warn!("could not resolve sector {sector}: {error}");
				self.world.modify(|world| {
					world.forget_sector(sector);
				});
				self.notifier.warn(format!("Sensors could not resolve sector {sector}"));
			}
		}

		if !sector.is_home() {
			self.sync.request_save(SaveReason::SectorArrival);
		}

		Entry::Initialized
	}

	/// Fetches the sector, or discovers it. If someone else discovers it between our fetch and our insert, their
	/// record is the real one.
	async fn resolve(&self, sector: SectorCoordinate) -> Result<Sector, StoreError> {
		let key = sector.to_string();

		if let Some(record) = self.store.select_sector(&key).await? {
			return Ok(Sector::try_from(record)?);
		}

		let discovered = {
			let mut rng = lock(&self.rng);
			Sector::generate(sector, &self.player, &mut *rng)
		};

		match self.store.insert_sector(&SectorRecord::from(&discovered)).await {
			Ok(()) => {
				info!("discovered sector {sector}");
				Ok(discovered)
			}
			Err(StoreError::Conflict(_)) => {
				debug!("sector {sector} was discovered concurrently, adopting the stored record");
				let record = self
					.store
					.select_sector(&key)
					.await?
					.ok_or_else(|| StoreError::Unavailable(format!("sector {key} vanished after a conflict").into()))?;
				Ok(Sector::try_from(record)?)
			}
			Err(error) => Err(error),
		}
	}

	fn populate(&self, sector: SectorCoordinate, record: &Sector) {
		let resources = self.world.read().resources_for(sector, &record.resources);

		let objects = {
			let mut rng = lock(&self.rng);
			scan(record.kind, &resources, &self.encounters, &mut *rng)
		};

		let mut populated = false;
		self.world
			.modify(|world| populated = world.populate_sector(sector, record.kind, resources, objects));

		if populated {
			self.scans.fetch_add(1, Relaxed);
			debug!("scanned {} objects in sector {sector}", self.world.read().local_objects().len());
		}
	}
}
