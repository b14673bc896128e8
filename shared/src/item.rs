use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU16, Ordering::Relaxed};
use std::{collections::BTreeMap, fmt, fmt::Display, fmt::Formatter, time::Duration};
use time::{macros::datetime, OffsetDateTime};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ItemId(u64);

impl ItemId {
	/// Milliseconds since the driftward epoch in the high bits, a wrapping counter in the low 12. Unique enough
	/// for items minted by one player's sessions.
	pub fn generate() -> Self {
		static COUNTER: AtomicU16 = AtomicU16::new(0);

		const DRIFTWARD_EPOCH: OffsetDateTime = datetime!(2024-01-01 00:00 UTC);

		let timestamp = (OffsetDateTime::now_utc() - DRIFTWARD_EPOCH).whole_milliseconds() as u64;
		let counter = COUNTER.fetch_add(1, Relaxed) as u64 & 0xFFF;

		Self(timestamp << 12 | counter)
	}

	pub const fn from_raw(raw: u64) -> Self {
		Self(raw)
	}
}

impl Display for ItemId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Item {
	pub id: ItemId,
	pub name: Box<str>,
	pub price: u64,
	pub kind: ItemKind,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ItemKind {
	Weapon { damage: u32 },
	Module(Module),
	Engine { jump_range: u32 },
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "module")]
pub enum Module {
	MiningLaser { cooldown_ms: u64, output: u32 },
	CargoPod { capacity: u32 },
}

/// Stats of one equipped mining laser, each of which runs its own extraction cycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MiningLaser {
	pub cooldown: Duration,
	pub output: u32,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotId {
	PrimaryWeapon,
	SecondaryWeapon,
	UtilityA,
	UtilityB,
	Engine,
}

impl SlotId {
	pub const ALL: [SlotId; 5] = [
		SlotId::PrimaryWeapon,
		SlotId::SecondaryWeapon,
		SlotId::UtilityA,
		SlotId::UtilityB,
		SlotId::Engine,
	];

	pub fn accepts(&self, kind: &ItemKind) -> bool {
		matches!(
			(self, kind),
			(SlotId::PrimaryWeapon | SlotId::SecondaryWeapon, ItemKind::Weapon { .. })
				| (SlotId::UtilityA | SlotId::UtilityB, ItemKind::Module(_))
				| (SlotId::Engine, ItemKind::Engine { .. })
		)
	}

	pub fn name(&self) -> &'static str {
		match self {
			SlotId::PrimaryWeapon => "primaryWeapon",
			SlotId::SecondaryWeapon => "secondaryWeapon",
			SlotId::UtilityA => "utilityA",
			SlotId::UtilityB => "utilityB",
			SlotId::Engine => "engine",
		}
	}
}

impl Display for SlotId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl std::str::FromStr for SlotId {
	type Err = Box<str>;

	fn from_str(string: &str) -> Result<Self, Self::Err> {
		SlotId::ALL
			.into_iter()
			.find(|slot| slot.name().eq_ignore_ascii_case(string))
			.ok_or_else(|| string.into())
	}
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Equipment(BTreeMap<SlotId, Item>);

impl Equipment {
	pub fn get(&self, slot: SlotId) -> Option<&Item> {
		self.0.get(&slot)
	}

	pub fn items(&self) -> impl Iterator<Item = (SlotId, &Item)> {
		self.0.iter().map(|(slot, item)| (*slot, item))
	}

	/// Puts `item` into `slot`, handing back whatever was there. Callers check [`SlotId::accepts`] first.
	pub(crate) fn replace(&mut self, slot: SlotId, item: Item) -> Option<Item> {
		self.0.insert(slot, item)
	}

	pub(crate) fn remove(&mut self, slot: SlotId) -> Option<Item> {
		self.0.remove(&slot)
	}

	pub fn weapon_damage(&self) -> Option<u32> {
		let mut weapons = self.0.values().filter_map(|item| match item.kind {
			ItemKind::Weapon { damage } => Some(damage),
			_ => None,
		});

		let first = weapons.next()?;
		Some(weapons.fold(first, |total, damage| total + damage))
	}

	pub fn mining_lasers(&self) -> Vec<MiningLaser> {
		self.0
			.values()
			.filter_map(|item| match item.kind {
				ItemKind::Module(Module::MiningLaser { cooldown_ms, output }) => Some(MiningLaser {
					cooldown: Duration::from_millis(cooldown_ms),
					output,
				}),
				_ => None,
			})
			.collect()
	}

	pub fn cargo_capacity(&self) -> u32 {
		self.0
			.values()
			.map(|item| match item.kind {
				ItemKind::Module(Module::CargoPod { capacity }) => capacity,
				_ => 0,
			})
			.sum()
	}

	pub fn jump_range(&self) -> Option<u32> {
		match self.0.get(&SlotId::Engine)?.kind {
			ItemKind::Engine { jump_range } => Some(jump_range),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn item(name: &str, kind: ItemKind) -> Item {
		Item {
			id: ItemId::generate(),
			name: name.into(),
			price: 10,
			kind,
		}
	}

	#[test]
	fn slots_only_accept_matching_kinds() {
		let laser = ItemKind::Module(Module::MiningLaser { cooldown_ms: 1000, output: 5 });

		assert!(SlotId::UtilityB.accepts(&laser));
		assert!(!SlotId::PrimaryWeapon.accepts(&laser));
		assert!(SlotId::Engine.accepts(&ItemKind::Engine { jump_range: 4 }));
		assert!(!SlotId::Engine.accepts(&ItemKind::Weapon { damage: 1 }));
	}

	#[test]
	fn equipment_summarises_stats() {
		let mut equipment = Equipment::default();
		assert_eq!(equipment.weapon_damage(), None);

		equipment.replace(SlotId::PrimaryWeapon, item("Pulse", ItemKind::Weapon { damage: 6 }));
		equipment.replace(SlotId::SecondaryWeapon, item("Flak", ItemKind::Weapon { damage: 3 }));
		equipment.replace(SlotId::UtilityA, item("Pod", ItemKind::Module(Module::CargoPod { capacity: 40 })));
		equipment.replace(
			SlotId::UtilityB,
			item("Laser", ItemKind::Module(Module::MiningLaser { cooldown_ms: 1500, output: 8 })),
		);

		assert_eq!(equipment.weapon_damage(), Some(9));
		assert_eq!(equipment.cargo_capacity(), 40);
		assert_eq!(
			equipment.mining_lasers(),
			vec![MiningLaser {
				cooldown: Duration::from_millis(1500),
				output: 8
			}]
		);
		assert_eq!(equipment.jump_range(), None);
	}

	#[test]
	fn generated_ids_are_distinct() {
		let ids: std::collections::HashSet<_> = (0..100).map(|_| ItemId::generate()).collect();
		assert_eq!(ids.len(), 100);
	}
}
