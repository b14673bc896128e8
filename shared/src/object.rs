use crate::{cargo::Cargo, cargo::Resource, item::Item};
use serde::{Deserialize, Serialize};
use std::{fmt, fmt::Display, fmt::Formatter};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ObjectId(u32);

impl ObjectId {
	pub const fn new(id: u32) -> Self {
		Self(id)
	}
}

impl Display for ObjectId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Something in the active sector. Objects only live until the player leaves or they are consumed.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SpaceObject {
	pub id: ObjectId,
	#[serde(flatten)]
	pub kind: ObjectKind,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ObjectKind {
	Asteroid(Deposit),
	Debris(Deposit),
	Enemy(Hostile),
	Station,
	Container(LootContainer),
	Player { name: Box<str> },
}

impl ObjectKind {
	pub fn name(&self) -> &'static str {
		match self {
			ObjectKind::Asteroid(_) => "asteroid",
			ObjectKind::Debris(_) => "debris",
			ObjectKind::Enemy(_) => "enemy",
			ObjectKind::Station => "station",
			ObjectKind::Container(_) => "container",
			ObjectKind::Player { .. } => "player",
		}
	}

	pub fn deposit(&self) -> Option<&Deposit> {
		match self {
			ObjectKind::Asteroid(deposit) | ObjectKind::Debris(deposit) => Some(deposit),
			_ => None,
		}
	}
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Deposit {
	pub resource: Resource,
	pub remaining: u32,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Hostile {
	pub name: Box<str>,
	pub hp: u32,
	pub max_hp: u32,
	pub damage: u32,
	pub loot: LootContainer,
}

/// Unclaimed credits, resources and items, either floating in a sector or won from a fight.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct LootContainer {
	pub credits: u64,
	pub resources: Cargo,
	pub items: Vec<Item>,
}

impl LootContainer {
	pub fn is_empty(&self) -> bool {
		self.credits == 0 && self.resources.is_empty() && self.items.is_empty()
	}

	pub fn merge(&mut self, other: LootContainer) {
		self.credits += other.credits;
		for (resource, quantity) in other.resources.iter() {
			self.resources.add(resource, quantity);
		}
		self.items.extend(other.items);
	}
}
