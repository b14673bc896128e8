use crate::{cargo::Resource, item::ItemId, item::SlotId, object::ObjectId, world::Status};
use thiserror::Error;

/// Every rejected operation is one of these, and none of them leave the world partially written.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error(transparent)]
pub enum WorldError {
	Insufficient(#[from] InsufficientResource),
	Invariant(#[from] InvariantViolation),
}

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum InsufficientResource {
	#[error("not enough credits, {needed} needed but only {available} available")]
	Credits { needed: u64, available: u64 },

	#[error("not enough fuel, {needed} needed but only {available} available")]
	Fuel { needed: u32, available: u32 },

	#[error("not enough cargo space, {needed} needed but only {available} free")]
	CargoSpace { needed: u32, available: u32 },

	#[error("not enough {resource} in cargo, {needed} needed but only {available} held")]
	Cargo { resource: Resource, needed: u32, available: u32 },

	#[error("hull is destroyed, repair before launching")]
	Hull,
}

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum InvariantViolation {
	#[error("cannot do that while {actual}")]
	Status { actual: Status },

	#[error("no target sector is plotted")]
	NoTarget,

	#[error("already at {0}")]
	AlreadyThere(crate::SectorCoordinate),

	#[error("target is {distance} sectors away but jump range is {jump_range}")]
	OutOfRange { distance: u64, jump_range: u32 },

	#[error("no mining lasers equipped")]
	NoMiningLasers,

	#[error("no object {0} in this sector")]
	UnknownObject(ObjectId),

	#[error("object {0} cannot be mined")]
	NotMinable(ObjectId),

	#[error("object {0} is not hostile")]
	NotHostile(ObjectId),

	#[error("object {0} is not a container")]
	NotContainer(ObjectId),

	#[error("no station in this sector")]
	NoStation,

	#[error("no item {0} in inventory")]
	UnknownItem(ItemId),

	#[error("nothing is equipped in {0}")]
	EmptySlot(SlotId),

	#[error("{0} does not fit {1}")]
	SlotMismatch(Box<str>, SlotId),

	#[error("nothing named {0:?} is for sale")]
	NotForSale(Box<str>),

	#[error("there is no loot to take")]
	NoLoot,
}
