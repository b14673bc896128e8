//! Rows of the `profiles` and `sectors` tables, and their conversion to and from the game model.

use driftward_shared::cargo::Cargo;
use driftward_shared::coordinate::CoordinateParseError;
use driftward_shared::item::{Equipment, Item};
use driftward_shared::sector::{Sector, SectorResources, SectorType};
use driftward_shared::{PersistentState, SectorCoordinate};
use sqlx::{types::Json, FromRow};
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Clone, Debug, FromRow)]
pub struct ProfileRecord {
	pub id: String,
	pub credits: i64,
	pub fuel: i32,
	pub max_fuel: i32,
	pub hull: i32,
	pub max_hull: i32,
	pub current_sector: String,
	pub cargo: Json<Cargo>,
	pub visited_sectors: Vec<String>,
	pub inventory: Json<Vec<Item>>,
	pub equipped: Json<Equipment>,
	pub updated_at: OffsetDateTime,
}

impl ProfileRecord {
	pub fn capture(id: &str, state: PersistentState) -> Self {
		let PersistentState {
			credits,
			fuel,
			max_fuel,
			hull,
			max_hull,
			current_sector,
			cargo,
			visited_sectors,
			inventory,
			equipped,
		} = state;

		Self {
			id: id.to_owned(),
			credits: i64::try_from(credits).unwrap_or(i64::MAX),
			fuel: clamp(fuel),
			max_fuel: clamp(max_fuel),
			hull: clamp(hull),
			max_hull: clamp(max_hull),
			current_sector: current_sector.to_string(),
			cargo: Json(cargo),
			visited_sectors: visited_sector_keys(visited_sectors.iter()),
			inventory: Json(inventory),
			equipped: Json(equipped),
			updated_at: OffsetDateTime::now_utc(),
		}
	}
}

/// Sorted so repeated saves of the same set write the same array.
pub fn visited_sector_keys<'a>(sectors: impl Iterator<Item = &'a SectorCoordinate>) -> Vec<String> {
	let mut keys: Vec<_> = sectors.copied().collect();
	keys.sort();
	keys.into_iter().map(|sector| sector.to_string()).collect()
}

fn clamp(value: u32) -> i32 {
	i32::try_from(value).unwrap_or(i32::MAX)
}

fn unsigned(field: &'static str, value: i64) -> Result<u64, RecordError> {
	u64::try_from(value).map_err(|_| RecordError::Negative(field, value))
}

impl TryFrom<ProfileRecord> for PersistentState {
	type Error = RecordError;

	fn try_from(record: ProfileRecord) -> Result<Self, Self::Error> {
		let narrow = |field, value: i32| unsigned(field, value.into()).map(|value| value as u32);

		Ok(Self {
			credits: unsigned("credits", record.credits)?,
			fuel: narrow("fuel", record.fuel)?,
			max_fuel: narrow("max_fuel", record.max_fuel)?,
			hull: narrow("hull", record.hull)?,
			max_hull: narrow("max_hull", record.max_hull)?,
			current_sector: record.current_sector.parse()?,
			cargo: record.cargo.0,
			visited_sectors: record
				.visited_sectors
				.iter()
				.map(|key| key.parse())
				.collect::<Result<_, _>>()?,
			inventory: record.inventory.0,
			equipped: record.equipped.0,
		})
	}
}

#[derive(Clone, Debug, Eq, FromRow, PartialEq)]
pub struct SectorRecord {
	pub id: String,
	pub discovered_by: Option<String>,
	pub sector_type: String,
	pub iron_amount: i32,
	pub gold_amount: i32,
	pub dark_matter_amount: i32,
}

impl From<&Sector> for SectorRecord {
	fn from(sector: &Sector) -> Self {
		Self {
			id: sector.coordinate.to_string(),
			discovered_by: sector.discovered_by.as_deref().map(str::to_owned),
			sector_type: sector.kind.to_string(),
			iron_amount: clamp(sector.resources.iron),
			gold_amount: clamp(sector.resources.gold),
			dark_matter_amount: clamp(sector.resources.dark_matter),
		}
	}
}

impl TryFrom<SectorRecord> for Sector {
	type Error = RecordError;

	fn try_from(record: SectorRecord) -> Result<Self, Self::Error> {
		let amount = |field, value: i32| unsigned(field, value.into()).map(|value| value as u32);

		Ok(Self {
			coordinate: record.id.parse()?,
			kind: record
				.sector_type
				.parse::<SectorType>()
				.map_err(RecordError::SectorType)?,
			resources: SectorResources {
				iron: amount("iron_amount", record.iron_amount)?,
				gold: amount("gold_amount", record.gold_amount)?,
				dark_matter: amount("dark_matter_amount", record.dark_matter_amount)?,
			},
			discovered_by: record.discovered_by.map(String::into_boxed_str),
		})
	}
}

#[derive(Debug, Error)]
pub enum RecordError {
	#[error("{0} is negative ({1})")]
	Negative(&'static str, i64),

	#[error("unknown sector type {0:?}")]
	SectorType(Box<str>),

	#[error(transparent)]
	Coordinate(#[from] CoordinateParseError),
}
