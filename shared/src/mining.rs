use crate::error::{InvariantViolation, WorldError};
use crate::item::MiningLaser;
use crate::object::{ObjectId, ObjectKind};
use crate::world::{Status, WorldState};

/// The result of one laser's cycle landing on its target.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MiningCredit {
	/// Keep going
	Credited { amount: u32, remaining: u32 },
	/// The deposit ran out and was removed; mining has stopped
	Depleted { amount: u32 },
	/// Nothing more fits; mining has stopped
	CargoFull { amount: u32 },
}

impl MiningCredit {
	pub fn amount(&self) -> u32 {
		match *self {
			MiningCredit::Credited { amount, .. }
			| MiningCredit::Depleted { amount }
			| MiningCredit::CargoFull { amount } => amount,
		}
	}

	pub fn is_final(&self) -> bool {
		!matches!(self, MiningCredit::Credited { .. })
	}
}

impl WorldState {
	/// Locks onto a deposit and returns the lasers that will work it, one cycle each.
	pub fn start_mining(&mut self, target: ObjectId) -> Result<Vec<MiningLaser>, WorldError> {
		self.require(&[Status::Space])?;

		match self.object(target).map(|object| &object.kind) {
			None => return Err(InvariantViolation::UnknownObject(target).into()),
			Some(kind) if kind.deposit().is_none() => return Err(InvariantViolation::NotMinable(target).into()),
			Some(_) => {}
		}

		let lasers = self.equipped.mining_lasers();
		if lasers.is_empty() {
			return Err(InvariantViolation::NoMiningLasers.into());
		}

		self.mining_target = Some(target);
		self.status = Status::Mining;
		Ok(lasers)
	}

	pub fn stop_mining(&mut self) -> Result<(), WorldError> {
		self.require(&[Status::Mining])?;
		self.mining_target = None;
		self.status = Status::Space;
		Ok(())
	}

	/// Moves up to `output` units from the target deposit into cargo, clipped to both the free capacity and what the
	/// deposit has left. Fails without writing if mining has been stopped or the target is gone.
	pub fn credit_mining_yield(&mut self, target: ObjectId, output: u32) -> Result<MiningCredit, WorldError> {
		self.require(&[Status::Mining])?;

		if self.mining_target != Some(target) {
			return Err(InvariantViolation::UnknownObject(target).into());
		}

		let free = self.free_cargo();
		let sector = self.current_sector;

		let object = self
			.local_objects
			.iter_mut()
			.find(|object| object.id == target)
			.ok_or(InvariantViolation::UnknownObject(target))?;

		let (deposit, tracked) = match &mut object.kind {
			ObjectKind::Asteroid(deposit) => (deposit, true),
			ObjectKind::Debris(deposit) => (deposit, false),
			_ => return Err(InvariantViolation::NotMinable(target).into()),
		};

		let amount = output.min(free).min(deposit.remaining);
		let resource = deposit.resource;
		deposit.remaining -= amount;
		let remaining = deposit.remaining;

		self.cargo.add(resource, amount);

		if tracked {
			self.sector_resources.deplete(resource, amount);
			self.depletion.insert(sector, self.sector_resources);
		}

		let credit = if remaining == 0 {
			self.remove_object(target);
			MiningCredit::Depleted { amount }
		} else if self.free_cargo() == 0 {
			MiningCredit::CargoFull { amount }
		} else {
			MiningCredit::Credited { amount, remaining }
		};

		if credit.is_final() {
			self.mining_target = None;
			self.status = Status::Space;
		}

		Ok(credit)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cargo::Resource;
	use crate::item::{Item, ItemId, ItemKind, Module, SlotId};
	use crate::object::Deposit;
	use crate::sector::SectorResources;
	use crate::world::tests::{spawn, world};

	fn laser(output: u32) -> Item {
		Item {
			id: ItemId::generate(),
			name: "Laser".into(),
			price: 100,
			kind: ItemKind::Module(Module::MiningLaser { cooldown_ms: 1000, output }),
		}
	}

	fn asteroid(resource: Resource, remaining: u32) -> ObjectKind {
		ObjectKind::Asteroid(Deposit { resource, remaining })
	}

	#[test]
	fn mining_requires_lasers() {
		let mut world = world();
		let rock = spawn(&mut world, asteroid(Resource::Iron, 50));

		assert_eq!(world.start_mining(rock), Err(InvariantViolation::NoMiningLasers.into()));
		assert_eq!(world.status(), Status::Space);
	}

	#[test]
	fn stations_cannot_be_mined() {
		let mut world = world();
		world.equipped.replace(SlotId::UtilityA, laser(5));
		let station = spawn(&mut world, ObjectKind::Station);

		assert_eq!(world.start_mining(station), Err(InvariantViolation::NotMinable(station).into()));
	}

	#[test]
	fn credits_are_clipped_to_capacity() {
		let mut world = world();
		world.base_cargo = 15;
		world.equipped.replace(SlotId::UtilityA, laser(10));
		let rock = spawn(&mut world, asteroid(Resource::Gold, 100));
		world.start_mining(rock).unwrap();

		assert_eq!(
			world.credit_mining_yield(rock, 10),
			Ok(MiningCredit::Credited { amount: 10, remaining: 90 })
		);
		assert_eq!(world.credit_mining_yield(rock, 10), Ok(MiningCredit::CargoFull { amount: 5 }));
		assert_eq!(world.cargo().total(), 15);
		assert_eq!(world.status(), Status::Space);

		// A late tick from a second laser must not write anything
		assert!(world.credit_mining_yield(rock, 10).is_err());
		assert_eq!(world.cargo().total(), 15);
	}

	#[test]
	fn depleted_asteroids_disappear_and_are_remembered() {
		let mut world = world();
		world.sector_resources = SectorResources { iron: 12, gold: 0, dark_matter: 0 };
		world.equipped.replace(SlotId::UtilityA, laser(10));
		let rock = spawn(&mut world, asteroid(Resource::Iron, 12));
		world.start_mining(rock).unwrap();

		world.credit_mining_yield(rock, 10).unwrap();
		assert_eq!(world.credit_mining_yield(rock, 10), Ok(MiningCredit::Depleted { amount: 2 }));

		assert!(world.object(rock).is_none());
		assert_eq!(world.cargo().get(Resource::Iron), 12);
		assert_eq!(world.sector_resources().iron, 0);
		assert_eq!(
			world.resources_for(world.current_sector(), &SectorResources { iron: 12, gold: 0, dark_matter: 0 }).iron,
			0
		);
	}
}
