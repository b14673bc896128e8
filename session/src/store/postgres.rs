use super::{ProfileStore, SectorStore, StoreError};
use async_trait::async_trait;
use driftward_backend_types::{ProfileRecord, SectorRecord};
use sqlx::{query, query_as, PgPool};

pub struct PgStore {
	database: PgPool,
}

impl PgStore {
	pub fn new(database: PgPool) -> Self {
		Self { database }
	}
}

#[async_trait]
impl ProfileStore for PgStore {
	async fn select_profile(&self, id: &str) -> Result<Option<ProfileRecord>, StoreError> {
		Ok(query_as(
			"SELECT id, credits, fuel, max_fuel, hull, max_hull, current_sector, cargo, visited_sectors, inventory,
				equipped, updated_at
			FROM profiles WHERE id = $1",
		)
		.bind(id)
		.fetch_optional(&self.database)
		.await?)
	}

	async fn update_profile(&self, profile: &ProfileRecord) -> Result<(), StoreError> {
		let result = query(
			"UPDATE profiles SET credits = $2, fuel = $3, max_fuel = $4, hull = $5, max_hull = $6, current_sector = $7,
				cargo = $8, visited_sectors = $9, inventory = $10, equipped = $11, updated_at = $12
			WHERE id = $1",
		)
		.bind(&profile.id)
		.bind(profile.credits)
		.bind(profile.fuel)
		.bind(profile.max_fuel)
		.bind(profile.hull)
		.bind(profile.max_hull)
		.bind(&profile.current_sector)
		.bind(&profile.cargo)
		.bind(&profile.visited_sectors)
		.bind(&profile.inventory)
		.bind(&profile.equipped)
		.bind(profile.updated_at)
		.execute(&self.database)
		.await?;

		match result.rows_affected() {
			0 => Err(StoreError::MissingProfile(profile.id.as_str().into())),
			_ => Ok(()),
		}
	}

	async fn update_visited_sectors(&self, id: &str, visited: &[String]) -> Result<(), StoreError> {
		let result = query("UPDATE profiles SET visited_sectors = $2, updated_at = now() WHERE id = $1")
			.bind(id)
			.bind(visited)
			.execute(&self.database)
			.await?;

		match result.rows_affected() {
			0 => Err(StoreError::MissingProfile(id.into())),
			_ => Ok(()),
		}
	}
}

#[async_trait]
impl SectorStore for PgStore {
	async fn select_sector(&self, id: &str) -> Result<Option<SectorRecord>, StoreError> {
		Ok(query_as(
			"SELECT id, discovered_by, sector_type, iron_amount, gold_amount, dark_matter_amount
			FROM sectors WHERE id = $1",
		)
		.bind(id)
		.fetch_optional(&self.database)
		.await?)
	}

	async fn insert_sector(&self, sector: &SectorRecord) -> Result<(), StoreError> {
		// Someone else may have discovered the sector since we looked, their record wins
		let result = query(
			"INSERT INTO sectors (id, discovered_by, sector_type, iron_amount, gold_amount, dark_matter_amount)
			VALUES ($1, $2, $3, $4, $5, $6)
			ON CONFLICT (id) DO NOTHING",
		)
		.bind(&sector.id)
		.bind(&sector.discovered_by)
		.bind(&sector.sector_type)
		.bind(sector.iron_amount)
		.bind(sector.gold_amount)
		.bind(sector.dark_matter_amount)
		.execute(&self.database)
		.await?;

		match result.rows_affected() {
			0 => Err(StoreError::Conflict(sector.id.as_str().into())),
			_ => Ok(()),
		}
	}
}
