//! Everything the player can do while docked: outfitting and trading.

use crate::cargo::Resource;
use crate::error::{InsufficientResource, InvariantViolation, WorldError};
use crate::item::{Item, ItemId, ItemKind, Module, SlotId};
use crate::world::{Status, WorldState};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Market {
	pub iron_price: u64,
	pub gold_price: u64,
	pub dark_matter_price: u64,
	pub repair_cost: u64,
	pub fuel_cost: u64,
	/// Fraction of an item's price paid back when selling it
	pub sell_ratio: f64,
	pub catalog: Vec<CatalogEntry>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CatalogEntry {
	pub name: Box<str>,
	pub price: u64,
	pub kind: ItemKind,
}

impl Default for Market {
	fn default() -> Self {
		Self {
			iron_price: 2,
			gold_price: 10,
			dark_matter_price: 50,
			repair_cost: 3,
			fuel_cost: 2,
			sell_ratio: 0.5,
			catalog: vec![
				CatalogEntry {
					name: "Mining Laser".into(),
					price: 150,
					kind: ItemKind::Module(Module::MiningLaser {
						cooldown_ms: 2000,
						output: 10,
					}),
				},
				CatalogEntry {
					name: "Deep Core Laser".into(),
					price: 600,
					kind: ItemKind::Module(Module::MiningLaser {
						cooldown_ms: 3000,
						output: 25,
					}),
				},
				CatalogEntry {
					name: "Cargo Pod".into(),
					price: 250,
					kind: ItemKind::Module(Module::CargoPod { capacity: 100 }),
				},
				CatalogEntry {
					name: "Pulse Cannon".into(),
					price: 200,
					kind: ItemKind::Weapon { damage: 8 },
				},
				CatalogEntry {
					name: "Long Range Drive".into(),
					price: 900,
					kind: ItemKind::Engine { jump_range: 6 },
				},
			],
		}
	}
}

impl Market {
	pub fn price(&self, resource: Resource) -> u64 {
		match resource {
			Resource::Iron => self.iron_price,
			Resource::Gold => self.gold_price,
			Resource::DarkMatter => self.dark_matter_price,
		}
	}

	pub fn entry(&self, name: &str) -> Option<&CatalogEntry> {
		self.catalog.iter().find(|entry| entry.name.eq_ignore_ascii_case(name))
	}
}

impl WorldState {
	fn spend(&mut self, cost: u64) -> Result<(), InsufficientResource> {
		match self.credits >= cost {
			true => {
				self.credits -= cost;
				Ok(())
			}
			false => Err(InsufficientResource::Credits {
				needed: cost,
				available: self.credits,
			}),
		}
	}

	/// The hold capacity left if `slot` held `item` instead of what it holds now.
	fn capacity_with(&self, slot: SlotId, item: Option<&Item>) -> u32 {
		let mut equipped = self.equipped.clone();
		match item {
			Some(item) => equipped.replace(slot, item.clone()),
			None => equipped.remove(slot),
		};
		self.base_cargo + equipped.cargo_capacity()
	}

	fn check_capacity(&self, capacity: u32) -> Result<(), InsufficientResource> {
		match self.cargo.total() <= capacity {
			true => Ok(()),
			false => Err(InsufficientResource::CargoSpace {
				needed: self.cargo.total(),
				available: capacity,
			}),
		}
	}

	pub fn equip(&mut self, item: ItemId, slot: SlotId) -> Result<(), WorldError> {
		self.require(&[Status::Hangar])?;

		let index = self
			.inventory
			.iter()
			.position(|candidate| candidate.id == item)
			.ok_or(InvariantViolation::UnknownItem(item))?;

		if !slot.accepts(&self.inventory[index].kind) {
			return Err(InvariantViolation::SlotMismatch(self.inventory[index].name.clone(), slot).into());
		}

		self.check_capacity(self.capacity_with(slot, Some(&self.inventory[index])))?;

		let item = self.inventory.remove(index);
		if let Some(displaced) = self.equipped.replace(slot, item) {
			self.inventory.push(displaced);
		}

		Ok(())
	}

	pub fn unequip(&mut self, slot: SlotId) -> Result<(), WorldError> {
		self.require(&[Status::Hangar])?;

		if self.equipped.get(slot).is_none() {
			return Err(InvariantViolation::EmptySlot(slot).into());
		}

		self.check_capacity(self.capacity_with(slot, None))?;

		if let Some(item) = self.equipped.remove(slot) {
			self.inventory.push(item);
		}

		Ok(())
	}

	pub fn buy(&mut self, market: &Market, name: &str) -> Result<ItemId, WorldError> {
		self.require(&[Status::Hangar])?;

		let entry = market.entry(name).ok_or_else(|| InvariantViolation::NotForSale(name.into()))?;
		self.spend(entry.price)?;

		let id = ItemId::generate();
		self.inventory.push(Item {
			id,
			name: entry.name.clone(),
			price: entry.price,
			kind: entry.kind.clone(),
		});

		Ok(id)
	}

	/// Returns the credits earned.
	pub fn sell(&mut self, market: &Market, resource: Resource, quantity: u32) -> Result<u64, WorldError> {
		self.require(&[Status::Hangar])?;

		let available = self.cargo.get(resource);
		if quantity > available {
			return Err(InsufficientResource::Cargo {
				resource,
				needed: quantity,
				available,
			}
			.into());
		}

		self.cargo.take(resource, quantity);
		let earned = u64::from(quantity) * market.price(resource);
		self.credits += earned;
		Ok(earned)
	}

	pub fn sell_item(&mut self, market: &Market, item: ItemId) -> Result<u64, WorldError> {
		self.require(&[Status::Hangar])?;

		let index = self
			.inventory
			.iter()
			.position(|candidate| candidate.id == item)
			.ok_or(InvariantViolation::UnknownItem(item))?;

		let item = self.inventory.remove(index);
		let earned = (item.price as f64 * market.sell_ratio.clamp(0.0, 1.0)) as u64;
		self.credits += earned;
		Ok(earned)
	}

	/// Repairs as much hull as the player can afford, returning the points restored.
	pub fn repair(&mut self, market: &Market) -> Result<u32, WorldError> {
		self.require(&[Status::Hangar])?;

		let missing = self.max_hull - self.hull;
		let points = self.affordable(missing, market.repair_cost)?;
		self.hull += points;
		Ok(points)
	}

	/// Tops up as much fuel as the player can afford, returning the units bought.
	pub fn refuel(&mut self, market: &Market) -> Result<u32, WorldError> {
		self.require(&[Status::Hangar])?;

		let missing = self.max_fuel - self.fuel;
		let units = self.affordable(missing, market.fuel_cost)?;
		self.fuel += units;
		Ok(units)
	}

	/// Buys up to `wanted` units at `unit_cost` each, failing only when not even one unit is affordable.
	fn affordable(&mut self, wanted: u32, unit_cost: u64) -> Result<u32, InsufficientResource> {
		if wanted == 0 {
			return Ok(0);
		}

		let units = match unit_cost {
			0 => wanted,
			cost => (self.credits / cost).min(u64::from(wanted)) as u32,
		};

		if units == 0 {
			return Err(InsufficientResource::Credits {
				needed: unit_cost,
				available: self.credits,
			});
		}

		self.spend(u64::from(units) * unit_cost)?;
		Ok(units)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::world::tests::world;

	fn docked() -> WorldState {
		let mut world = world();
		world.status = Status::Hangar;
		world
	}

	#[test]
	fn buying_needs_credits() {
		let mut world = docked();
		let market = Market::default();
		world.credits = 100;

		assert_eq!(
			world.buy(&market, "pulse cannon"),
			Err(InsufficientResource::Credits { needed: 200, available: 100 }.into())
		);
		assert!(world.inventory().is_empty());

		world.credits = 1000;
		let id = world.buy(&market, "Pulse Cannon").unwrap();
		assert_eq!(world.credits(), 800);
		assert_eq!(world.inventory()[0].id, id);
	}

	#[test]
	fn market_is_closed_in_space() {
		let mut world = world();
		assert_eq!(
			world.buy(&Market::default(), "Cargo Pod"),
			Err(InvariantViolation::Status { actual: Status::Space }.into())
		);
	}

	#[test]
	fn equipping_swaps_into_inventory() {
		let mut world = docked();
		world.credits = 10_000;
		let market = Market::default();
		let first = world.buy(&market, "Mining Laser").unwrap();
		let second = world.buy(&market, "Deep Core Laser").unwrap();

		world.equip(first, SlotId::UtilityA).unwrap();
		world.equip(second, SlotId::UtilityA).unwrap();

		assert_eq!(world.equipped().get(SlotId::UtilityA).map(|item| item.id), Some(second));
		assert_eq!(world.inventory().iter().map(|item| item.id).collect::<Vec<_>>(), vec![first]);
		assert!(matches!(
			world.equip(first, SlotId::Engine),
			Err(WorldError::Invariant(InvariantViolation::SlotMismatch(..)))
		));
	}

	#[test]
	fn cargo_pods_cannot_be_removed_while_full() {
		let mut world = docked();
		world.credits = 1000;
		let market = Market::default();
		let pod = world.buy(&market, "Cargo Pod").unwrap();
		world.equip(pod, SlotId::UtilityB).unwrap();
		assert_eq!(world.max_cargo(), 300);

		world.cargo.add(Resource::Iron, 250);
		assert_eq!(
			world.unequip(SlotId::UtilityB),
			Err(InsufficientResource::CargoSpace { needed: 250, available: 200 }.into())
		);
		assert!(world.equipped().get(SlotId::UtilityB).is_some());

		world.sell(&market, Resource::Iron, 100).unwrap();
		world.unequip(SlotId::UtilityB).unwrap();
		assert_eq!(world.max_cargo(), 200);
	}

	#[test]
	fn selling_more_than_held_is_rejected() {
		let mut world = docked();
		world.cargo.add(Resource::Gold, 3);

		assert_eq!(
			world.sell(&Market::default(), Resource::Gold, 4),
			Err(InsufficientResource::Cargo {
				resource: Resource::Gold,
				needed: 4,
				available: 3
			}
			.into())
		);
		assert_eq!(world.sell(&Market::default(), Resource::Gold, 3), Ok(30));
		assert_eq!(world.credits(), 530);
	}

	#[test]
	fn repairs_are_partial_when_short_on_credits() {
		let mut world = docked();
		world.hull = 0;
		world.credits = 31;

		assert_eq!(world.repair(&Market::default()), Ok(10));
		assert_eq!(world.hull(), 10);
		assert_eq!(world.credits(), 1);

		assert_eq!(
			world.repair(&Market::default()),
			Err(InsufficientResource::Credits { needed: 3, available: 1 }.into())
		);
		assert_eq!(world.hull(), 10);
	}

	#[test]
	fn sold_items_pay_back_part_of_their_price() {
		let mut world = docked();
		world.credits = 150;
		let laser = world.buy(&Market::default(), "Mining Laser").unwrap();

		assert_eq!(world.sell_item(&Market::default(), laser), Ok(75));
		assert!(world.inventory().is_empty());
		assert_eq!(world.sell_item(&Market::default(), laser), Err(InvariantViolation::UnknownItem(laser).into()));
	}
}
