//! The remote copy of the player's state, seen as two tables. Everything in here may suspend.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use driftward_backend_types::{ProfileRecord, RecordError, SectorRecord};
use thiserror::Error;

#[async_trait]
pub trait ProfileStore: Send + Sync {
	async fn select_profile(&self, id: &str) -> Result<Option<ProfileRecord>, StoreError>;

	async fn update_profile(&self, profile: &ProfileRecord) -> Result<(), StoreError>;

	/// Partial update of just the visited set.
	async fn update_visited_sectors(&self, id: &str, visited: &[String]) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SectorStore: Send + Sync {
	async fn select_sector(&self, id: &str) -> Result<Option<SectorRecord>, StoreError>;

	/// Inserts only if no sector with the same id exists, otherwise fails with [`StoreError::Conflict`].
	async fn insert_sector(&self, sector: &SectorRecord) -> Result<(), StoreError>;
}

#[derive(Debug, Error)]
pub enum StoreError {
	#[error("sector {0} was discovered concurrently")]
	Conflict(Box<str>),

	#[error("no profile {0}")]
	MissingProfile(Box<str>),

	#[error("store unavailable: {0}")]
	Unavailable(Box<str>),

	#[error(transparent)]
	Malformed(#[from] RecordError),

	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
}
