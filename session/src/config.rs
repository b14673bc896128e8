use driftward_shared::{combat::CombatRules, hangar::Market, sector::EncounterTable, ShipSpec};
use serde::Deserialize;
use std::{fs::read_to_string, io, path::Path, time::Duration};
use thiserror::Error;

/// Session tuning, read from a HOCON file. Every section and field is optional.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
	pub ship: ShipSpec,
	pub travel: Travel,
	pub saving: Saving,
	pub combat: CombatRules,
	pub encounters: EncounterTable,
	pub market: Market,
	/// Seeds every random roll, for reproducible sessions
	pub seed: Option<u64>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Travel {
	pub warp_ms: u64,
	pub fuel_per_sector: u32,
	/// Start the next hop of a multi-hop course as soon as the previous one lands
	pub autopilot: bool,
}

impl Default for Travel {
	fn default() -> Self {
		Self {
			warp_ms: 3000,
			fuel_per_sector: 1,
			autopilot: true,
		}
	}
}

impl Travel {
	pub fn warp_duration(&self) -> Duration {
		Duration::from_millis(self.warp_ms)
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Saving {
	pub cargo_debounce_ms: u64,
}

impl Default for Saving {
	fn default() -> Self {
		Self { cargo_debounce_ms: 1000 }
	}
}

impl Saving {
	pub fn cargo_debounce(&self) -> Duration {
		Duration::from_millis(self.cargo_debounce_ms)
	}
}

impl Config {
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		Self::parse(&read_to_string(path)?)
	}

	pub fn parse(string: &str) -> Result<Self, ConfigError> {
		Ok(hocon::de::from_str(string)?)
	}
}

#[derive(Debug, Error)]
#[error(transparent)]
pub enum ConfigError {
	Io(#[from] io::Error),
	Parse(#[from] hocon::Error),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missing_sections_fall_back_to_defaults() {
		let config = Config::parse(
			r#"
			ship { jump_range = 5, max_hull = 80 }
			travel.autopilot = false
			seed = 42
			"#,
		)
		.unwrap();

		assert_eq!(config.ship.jump_range, 5);
		assert_eq!(config.ship.max_hull, 80);
		assert_eq!(config.ship.max_fuel, ShipSpec::default().max_fuel);
		assert!(!config.travel.autopilot);
		assert_eq!(config.travel.warp_ms, 3000);
		assert_eq!(config.saving.cargo_debounce(), Duration::from_secs(1));
		assert_eq!(config.seed, Some(42));
		assert!(!config.market.catalog.is_empty());
	}

	#[test]
	fn sample_config_parses() {
		let config = Config::load(Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/session.conf"))).unwrap();

		assert_eq!(config.ship.max_fuel, 120);
		assert_eq!(config.combat.defeat_cargo_loss_percent, 50);
		assert_eq!(config.encounters.max_hostiles, 2);
		assert_eq!(config.seed, None);
	}
}
