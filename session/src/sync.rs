//! Keeps the remote profile in step with the session's [`World`].
//!
//! Nothing is written until the profile has been loaded once, since a write before that would replace the player's
//! progress with a fresh ship. Saves are not serialized against each other: each one carries a complete snapshot
//! taken when it starts, so whichever lands last wins and it is never older than the state at its start.

use crate::lock;
use crate::notification::Notifier;
use crate::store::{ProfileStore, StoreError};
use crate::world::World;
use driftward_backend_types::{visited_sector_keys, ProfileRecord, RecordError};
use driftward_shared::PersistentState;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex};
use std::{fmt, fmt::Display, fmt::Formatter, time::Duration};
use thiserror::Error;
use tokio::{task::JoinHandle, time::sleep};

#[derive(Clone, Debug)]
pub struct SessionInfo {
	pub player: Box<str>,
	pub authenticated: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SaveReason {
	Hangar,
	SectorArrival,
	Cargo,
	Manual,
}

impl Display for SaveReason {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			SaveReason::Hangar => "hangar",
			SaveReason::SectorArrival => "sector arrival",
			SaveReason::Cargo => "cargo change",
			SaveReason::Manual => "manual",
		})
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadOutcome {
	Loaded,
	/// A load already ran or is running for this session
	Skipped,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SaveOutcome {
	Saved,
	/// The profile has not been loaded, so there is nothing safe to write
	Skipped,
}

#[derive(Debug, Error)]
pub enum SyncError {
	#[error("session is not authenticated")]
	Unauthenticated,

	#[error("no profile for {0}")]
	NotFound(Box<str>),

	#[error(transparent)]
	Store(#[from] StoreError),

	#[error(transparent)]
	Record(#[from] RecordError),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum LoadState {
	Idle,
	Loading,
	Loaded,
}

pub struct SyncEngine {
	session: SessionInfo,
	store: Arc<dyn ProfileStore>,
	world: World,
	notifier: Notifier,
	cargo_debounce: Duration,

	load_state: Mutex<LoadState>,
	pending_cargo_save: Mutex<Option<JoinHandle<()>>>,
}

impl SyncEngine {
	pub fn new(
		session: SessionInfo,
		store: Arc<dyn ProfileStore>,
		world: World,
		notifier: Notifier,
		cargo_debounce: Duration,
	) -> Arc<Self> {
		Arc::new(Self {
			session,
			store,
			world,
			notifier,
			cargo_debounce,
			load_state: Mutex::new(LoadState::Idle),
			pending_cargo_save: Mutex::new(None),
		})
	}

	pub fn session(&self) -> &SessionInfo {
		&self.session
	}

	pub fn is_loaded(&self) -> bool {
		*lock(&self.load_state) == LoadState::Loaded
	}

	/// Replaces the world with the remote profile, once per session. Later calls, including ones made while the
	/// first is still waiting on the store, do nothing, so a slow response can never clobber newer local state.
	pub async fn load(&self) -> Result<LoadOutcome, SyncError> {
		if !self.session.authenticated {
			return Err(SyncError::Unauthenticated);
		}

		{
			let mut state = lock(&self.load_state);
			if *state != LoadState::Idle {
				debug!("profile load for {} already {:?}", self.session.player, *state);
				return Ok(LoadOutcome::Skipped);
			}
			*state = LoadState::Loading;
		}

		let result = self.fetch().await;

		let mut state = lock(&self.load_state);
		match result {
			Ok(profile) => {
				self.world.modify(|world| world.restore(profile));
				*state = LoadState::Loaded;
				info!("loaded profile for {}", self.session.player);
				Ok(LoadOutcome::Loaded)
			}
			Err(error) => {
				*state = LoadState::Idle;
				warn!("failed to load profile for {}: {error}", self.session.player);
				self.notifier.warn(format!("Could not load your profile: {error}"));
				Err(error)
			}
		}
	}

	async fn fetch(&self) -> Result<PersistentState, SyncError> {
		let record = self
			.store
			.select_profile(&self.session.player)
			.await?
			.ok_or_else(|| SyncError::NotFound(self.session.player.clone()))?;

		Ok(PersistentState::try_from(record)?)
	}

	/// Writes a snapshot of the current state. Failures are reported and not retried, the next trigger will carry
	/// whatever has changed since.
	pub async fn save(&self, reason: SaveReason) -> Result<SaveOutcome, SyncError> {
		if !self.is_loaded() {
			debug!("skipping {reason} save, profile not loaded");
			return Ok(SaveOutcome::Skipped);
		}

		let record = ProfileRecord::capture(&self.session.player, self.world.read().persistent());

		match self.store.update_profile(&record).await {
			Ok(()) => {
				debug!("saved profile for {} ({reason})", self.session.player);
				Ok(SaveOutcome::Saved)
			}
			Err(error) => {
				warn!("failed to save profile for {} ({reason}): {error}", self.session.player);
				self.notifier.warn(format!("Could not save your progress: {error}"));
				Err(error.into())
			}
		}
	}

	/// Saves in the background.
	pub fn request_save(self: &Arc<Self>, reason: SaveReason) {
		let engine = Arc::clone(self);
		tokio::spawn(async move {
			// save has already logged and reported any failure
			let _ = engine.save(reason).await;
		});
	}

	/// Saves once cargo has stopped changing for the debounce window. Each call cancels the previous timer, so a burst
	/// of changes produces a single save of the final state.
	pub fn schedule_cargo_save(self: &Arc<Self>) {
		let engine = Arc::downgrade(self);
		let debounce = self.cargo_debounce;

		let mut pending = lock(&self.pending_cargo_save);
		if let Some(previous) = pending.take() {
			previous.abort();
		}

		*pending = Some(tokio::spawn(async move {
			sleep(debounce).await;
			if let Some(engine) = engine.upgrade() {
				engine.request_save(SaveReason::Cargo);
			}
		}));
	}

	/// Pushes the visited set on its own. Nobody waits for this write and a failure is only logged; the next full
	/// save carries the set again.
	pub fn dispatch_visited_update(self: &Arc<Self>) {
		let visited = visited_sector_keys(self.world.read().visited_sectors().iter());
		let engine = Arc::clone(self);

		tokio::spawn(async move {
			if !engine.is_loaded() {
				debug!("skipping visited sector update, profile not loaded");
				return;
			}

			match engine.store.update_visited_sectors(&engine.session.player, &visited).await {
				Ok(()) => debug!("recorded {} visited sectors", visited.len()),
				Err(error) => warn!("failed to record visited sectors: {error}"),
			}
		});
	}
}

impl Drop for SyncEngine {
	fn drop(&mut self) {
		if let Some(pending) = lock(&self.pending_cargo_save).take() {
			pending.abort();
		}
	}
}
