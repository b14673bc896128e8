use super::{ProfileStore, SectorStore, StoreError};
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use driftward_backend_types::{ProfileRecord, SectorRecord};
use driftward_shared::sector::{Sector, SectorResources, SectorType};
use driftward_shared::HOME;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering::Relaxed};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;

/// A store held in process memory, for running without a database and for tests.
///
/// Every call waits `latency` before touching the maps so that calls can overlap in flight, and
/// [`MemoryStore::set_failing`] makes every call fail as if the network were down.
#[derive(Default)]
pub struct MemoryStore {
	profiles: DashMap<Box<str>, ProfileRecord>,
	sectors: DashMap<Box<str>, SectorRecord>,

	/// Records another player will have inserted by the time we try to insert the same id. Invisible to selects.
	rivals: DashMap<Box<str>, SectorRecord>,

	latency: Duration,
	failing: AtomicBool,

	profile_writes: Mutex<Vec<ProfileRecord>>,
	visited_writes: AtomicUsize,
	sector_reads: AtomicUsize,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_latency(latency: Duration) -> Self {
		Self {
			latency,
			..Self::default()
		}
	}

	pub fn insert_profile(&self, profile: ProfileRecord) {
		self.profiles.insert(profile.id.as_str().into(), profile);
	}

	pub fn insert_sector_record(&self, sector: SectorRecord) {
		self.sectors.insert(sector.id.as_str().into(), sector);
	}

	/// The home station, as the migrations seed it.
	pub fn seed_home(&self) {
		self.insert_sector_record(SectorRecord::from(&Sector {
			coordinate: HOME,
			kind: SectorType::Station,
			resources: SectorResources::default(),
			discovered_by: None,
		}));
	}

	/// Simulates a concurrent discoverer winning the race for `sector`.
	pub fn rival_discovery(&self, sector: SectorRecord) {
		self.rivals.insert(sector.id.as_str().into(), sector);
	}

	pub fn set_failing(&self, failing: bool) {
		self.failing.store(failing, Relaxed);
	}

	pub fn profile(&self, id: &str) -> Option<ProfileRecord> {
		self.profiles.get(id).map(|profile| profile.value().clone())
	}

	pub fn sector(&self, id: &str) -> Option<SectorRecord> {
		self.sectors.get(id).map(|sector| sector.value().clone())
	}

	/// Every full profile write, in the order they landed.
	pub fn profile_writes(&self) -> Vec<ProfileRecord> {
		self.profile_writes.lock().map(|writes| writes.clone()).unwrap_or_default()
	}

	pub fn visited_writes(&self) -> usize {
		self.visited_writes.load(Relaxed)
	}

	pub fn sector_reads(&self) -> usize {
		self.sector_reads.load(Relaxed)
	}

	async fn round_trip(&self) -> Result<(), StoreError> {
		if !self.latency.is_zero() {
			sleep(self.latency).await;
		}

		match self.failing.load(Relaxed) {
			true => Err(StoreError::Unavailable("memory store is failing".into())),
			false => Ok(()),
		}
	}
}

#[async_trait]
impl ProfileStore for MemoryStore {
	async fn select_profile(&self, id: &str) -> Result<Option<ProfileRecord>, StoreError> {
		self.round_trip().await?;
		Ok(self.profile(id))
	}

	async fn update_profile(&self, profile: &ProfileRecord) -> Result<(), StoreError> {
		self.round_trip().await?;

		match self.profiles.get_mut(profile.id.as_str()) {
			None => Err(StoreError::MissingProfile(profile.id.as_str().into())),
			Some(mut stored) => {
				*stored = profile.clone();
				if let Ok(mut writes) = self.profile_writes.lock() {
					writes.push(profile.clone());
				}
				Ok(())
			}
		}
	}

	async fn update_visited_sectors(&self, id: &str, visited: &[String]) -> Result<(), StoreError> {
		self.round_trip().await?;

		match self.profiles.get_mut(id) {
			None => Err(StoreError::MissingProfile(id.into())),
			Some(mut stored) => {
				stored.visited_sectors = visited.to_vec();
				self.visited_writes.fetch_add(1, Relaxed);
				Ok(())
			}
		}
	}
}

#[async_trait]
impl SectorStore for MemoryStore {
	async fn select_sector(&self, id: &str) -> Result<Option<SectorRecord>, StoreError> {
		self.sector_reads.fetch_add(1, Relaxed);
		self.round_trip().await?;
		Ok(self.sector(id))
	}

	async fn insert_sector(&self, sector: &SectorRecord) -> Result<(), StoreError> {
		self.round_trip().await?;

		if let Some((id, rival)) = self.rivals.remove(sector.id.as_str()) {
			self.sectors.insert(id, rival);
		}

		match self.sectors.entry(sector.id.as_str().into()) {
			Entry::Occupied(_) => Err(StoreError::Conflict(sector.id.as_str().into())),
			Entry::Vacant(entry) => {
				entry.insert(sector.clone());
				Ok(())
			}
		}
	}
}
