use crate::cargo::{Cargo, Resource};
use crate::item::{Item, ItemId, ItemKind};
use crate::object::{Deposit, Hostile, LootContainer, ObjectKind};
use crate::SectorCoordinate;
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use std::{fmt, fmt::Display, fmt::Formatter, str::FromStr};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SectorType {
	#[default]
	Wild,
	Station,
}

impl SectorType {
	pub fn name(&self) -> &'static str {
		match self {
			SectorType::Wild => "wild",
			SectorType::Station => "station",
		}
	}
}

impl Display for SectorType {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for SectorType {
	type Err = Box<str>;

	fn from_str(string: &str) -> Result<Self, Self::Err> {
		match string {
			"wild" => Ok(SectorType::Wild),
			"station" => Ok(SectorType::Station),
			other => Err(other.into()),
		}
	}
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct SectorResources {
	pub iron: u32,
	pub gold: u32,
	pub dark_matter: u32,
}

impl SectorResources {
	pub fn get(&self, resource: Resource) -> u32 {
		match resource {
			Resource::Iron => self.iron,
			Resource::Gold => self.gold,
			Resource::DarkMatter => self.dark_matter,
		}
	}

	pub fn deplete(&mut self, resource: Resource, amount: u32) {
		let deposit = match resource {
			Resource::Iron => &mut self.iron,
			Resource::Gold => &mut self.gold,
			Resource::DarkMatter => &mut self.dark_matter,
		};
		*deposit = deposit.saturating_sub(amount);
	}
}

/// The durable record of a sector. Created once by whoever discovers it first.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Sector {
	pub coordinate: SectorCoordinate,
	pub kind: SectorType,
	pub resources: SectorResources,
	pub discovered_by: Option<Box<str>>,
}

impl Sector {
	pub fn generate(coordinate: SectorCoordinate, discovered_by: &str, rng: &mut impl Rng) -> Self {
		let iron = rng.gen_range(100..600);
		let gold = rng.gen_range(0..200);
		let dark_matter = match rng.gen_bool(0.1) {
			true => rng.gen_range(0..50),
			false => 0,
		};

		Self {
			coordinate,
			kind: SectorType::Wild,
			resources: SectorResources { iron, gold, dark_matter },
			discovered_by: Some(discovered_by.into()),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EncounterTable {
	/// Largest deposit a single asteroid holds, bigger sector deposits are split into several asteroids.
	pub asteroid_size: u32,
	pub min_hostiles: u32,
	pub max_hostiles: u32,
	pub container_chance: f64,
	pub debris_chance: f64,
	pub hostiles: Vec<HostileTemplate>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct HostileTemplate {
	pub name: Box<str>,
	pub hp: u32,
	pub damage: u32,
	pub bounty: u64,
	#[serde(default)]
	pub loot: Vec<LootTemplate>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LootTemplate {
	pub name: Box<str>,
	pub price: u64,
	pub kind: ItemKind,
	/// Probability of the item dropping
	pub chance: f64,
}

impl Default for EncounterTable {
	fn default() -> Self {
		Self {
			asteroid_size: 250,
			min_hostiles: 0,
			max_hostiles: 2,
			container_chance: 0.25,
			debris_chance: 0.3,
			hostiles: vec![
				HostileTemplate {
					name: "Scavenger".into(),
					hp: 20,
					damage: 3,
					bounty: 40,
					loot: vec![LootTemplate {
						name: "Scrap Cannon".into(),
						price: 120,
						kind: ItemKind::Weapon { damage: 6 },
						chance: 0.2,
					}],
				},
				HostileTemplate {
					name: "Raider".into(),
					hp: 45,
					damage: 6,
					bounty: 110,
					loot: vec![LootTemplate {
						name: "Raider Drive".into(),
						price: 400,
						kind: ItemKind::Engine { jump_range: 5 },
						chance: 0.1,
					}],
				},
			],
		}
	}
}

impl LootTemplate {
	fn roll(&self, rng: &mut impl Rng) -> Option<Item> {
		rng.gen_bool(self.chance.clamp(0.0, 1.0)).then(|| Item {
			id: ItemId::generate(),
			name: self.name.clone(),
			price: self.price,
			kind: self.kind.clone(),
		})
	}
}

impl HostileTemplate {
	fn spawn(&self, rng: &mut impl Rng) -> Hostile {
		Hostile {
			name: self.name.clone(),
			hp: self.hp,
			max_hp: self.hp,
			damage: self.damage,
			loot: LootContainer {
				credits: self.bounty,
				resources: Cargo::default(),
				items: self.loot.iter().filter_map(|loot| loot.roll(rng)).collect(),
			},
		}
	}
}

/// Turns a sector's profile into the objects the player finds on arrival.
///
/// `resources` is what is left of the sector for this session, which may be less than the durable record.
pub fn scan(
	kind: SectorType,
	resources: &SectorResources,
	table: &EncounterTable,
	rng: &mut impl Rng,
) -> Vec<ObjectKind> {
	let mut objects = vec![];

	if kind == SectorType::Station {
		objects.push(ObjectKind::Station);
	}

	let asteroid_size = table.asteroid_size.max(1);
	for resource in Resource::ALL {
		let amount = resources.get(resource);
		if amount == 0 {
			continue;
		}

		let count = amount.div_ceil(asteroid_size);
		for index in 0..count {
			// Spread the remainder over the first few asteroids so the sum matches exactly
			let remaining = amount / count + u32::from(index < amount % count);
			objects.push(ObjectKind::Asteroid(Deposit { resource, remaining }));
		}
	}

	if kind == SectorType::Wild {
		if !table.hostiles.is_empty() {
			let max_hostiles = table.max_hostiles.max(table.min_hostiles);
			for _ in 0..rng.gen_range(table.min_hostiles..=max_hostiles) {
				if let Some(template) = table.hostiles.choose(rng) {
					objects.push(ObjectKind::Enemy(template.spawn(rng)));
				}
			}
		}

		if rng.gen_bool(table.container_chance.clamp(0.0, 1.0)) {
			let resource = *Resource::ALL.choose(rng).unwrap_or(&Resource::Iron);
			objects.push(ObjectKind::Container(LootContainer {
				credits: rng.gen_range(0..50),
				resources: [(resource, rng.gen_range(1..20))].into_iter().collect(),
				items: vec![],
			}));
		}

		if rng.gen_bool(table.debris_chance.clamp(0.0, 1.0)) {
			objects.push(ObjectKind::Debris(Deposit {
				resource: Resource::Iron,
				remaining: rng.gen_range(10..40),
			}));
		}
	}

	objects
}
