use crate::error::{InvariantViolation, WorldError};
use crate::object::{Hostile, ObjectId, ObjectKind, SpaceObject};
use crate::world::{Status, WorldState};
use crate::HOME;
use rand::Rng;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CombatRules {
	/// Damage dealt with no weapons equipped
	pub unarmed_damage: u32,
	/// Upper bound of the random bonus added to every attack
	pub damage_variance: u32,
	pub flee_chance: f64,
	pub defeat_cargo_loss_percent: u32,
}

impl Default for CombatRules {
	fn default() -> Self {
		Self {
			unarmed_damage: 2,
			damage_variance: 3,
			flee_chance: 0.5,
			defeat_cargo_loss_percent: 50,
		}
	}
}

impl CombatRules {
	pub fn roll_damage(&self, world: &WorldState, rng: &mut impl Rng) -> u32 {
		let base = world.equipped.weapon_damage().unwrap_or(self.unarmed_damage);
		base + rng.gen_range(0..=self.damage_variance)
	}

	pub fn roll_flee(&self, rng: &mut impl Rng) -> bool {
		rng.gen_bool(self.flee_chance.clamp(0.0, 1.0))
	}
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AttackOutcome {
	/// Both sides hit and both survived
	Exchanged { dealt: u32, taken: u32, enemy_hp: u32, hull: u32 },
	Victory { dealt: u32, enemy: Box<str> },
	Defeat { dealt: u32, taken: u32 },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FleeOutcome {
	Escaped,
	Caught { taken: u32, hull: u32 },
	Defeat { taken: u32 },
}

impl WorldState {
	fn engaged_hostile(&mut self) -> Result<(ObjectId, &mut Hostile), WorldError> {
		self.require(&[Status::Combat])?;

		let id = self.engagement.ok_or(InvariantViolation::Status { actual: self.status })?;
		match self.local_objects.iter_mut().find(|object| object.id == id) {
			Some(SpaceObject {
				kind: ObjectKind::Enemy(hostile),
				..
			}) => Ok((id, hostile)),
			_ => Err(InvariantViolation::UnknownObject(id).into()),
		}
	}

	pub fn engage(&mut self, id: ObjectId) -> Result<(), WorldError> {
		self.require(&[Status::Space])?;

		match self.object(id).map(|object| &object.kind) {
			Some(ObjectKind::Enemy(_)) => {}
			Some(_) => return Err(InvariantViolation::NotHostile(id).into()),
			None => return Err(InvariantViolation::UnknownObject(id).into()),
		}

		self.engagement = Some(id);
		self.status = Status::Combat;
		Ok(())
	}

	/// One simultaneous exchange: the player's `damage` lands, and unless it kills the hostile the hostile's counter
	/// damage lands on the hull in the same tick.
	pub fn attack(&mut self, damage: u32, rules: &CombatRules) -> Result<AttackOutcome, WorldError> {
		let (id, hostile) = self.engaged_hostile()?;

		hostile.hp = hostile.hp.saturating_sub(damage);

		if hostile.hp == 0 {
			let enemy = hostile.name.clone();
			if let Some(SpaceObject {
				kind: ObjectKind::Enemy(hostile),
				..
			}) = self.remove_object(id)
			{
				self.grant_loot(hostile.loot);
			}

			self.engagement = None;
			self.status = Status::Space;
			return Ok(AttackOutcome::Victory { dealt: damage, enemy });
		}

		let (enemy_hp, taken) = (hostile.hp, hostile.damage);
		self.hull = self.hull.saturating_sub(taken);

		match self.hull {
			0 => {
				self.defeat(rules);
				Ok(AttackOutcome::Defeat { dealt: damage, taken })
			}
			hull => Ok(AttackOutcome::Exchanged {
				dealt: damage,
				taken,
				enemy_hp,
				hull,
			}),
		}
	}

	/// Attempts to break off. A failed attempt gives the hostile a free hit.
	pub fn flee(&mut self, escaped: bool, rules: &CombatRules) -> Result<FleeOutcome, WorldError> {
		let (_, hostile) = self.engaged_hostile()?;
		let taken = hostile.damage;

		if escaped {
			self.engagement = None;
			self.status = Status::Space;
			return Ok(FleeOutcome::Escaped);
		}

		self.hull = self.hull.saturating_sub(taken);

		match self.hull {
			0 => {
				self.defeat(rules);
				Ok(FleeOutcome::Defeat { taken })
			}
			hull => Ok(FleeOutcome::Caught { taken, hull }),
		}
	}

	/// The ship is towed home with part of its cargo lost. The hull is left wrecked until repaired.
	fn defeat(&mut self, rules: &CombatRules) {
		let percent = rules.defeat_cargo_loss_percent.min(100);
		let losses: Vec<_> = self
			.cargo
			.iter()
			.map(|(resource, quantity)| (resource, (quantity * percent).div_ceil(100)))
			.collect();

		for (resource, lost) in losses {
			self.cargo.take(resource, lost);
		}

		self.hull = 0;
		self.current_sector = HOME;
		self.local_objects.clear();
		self.loot = None;
		self.engagement = None;
		self.mining_target = None;
		self.target_sector = None;
		self.final_destination = None;
		self.status = Status::Hangar;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cargo::Resource;
	use crate::object::LootContainer;
	use crate::world::tests::{spawn, world};
	use crate::SectorCoordinate;

	fn hostile(hp: u32, damage: u32) -> ObjectKind {
		ObjectKind::Enemy(Hostile {
			name: "Raider".into(),
			hp,
			max_hp: hp,
			damage,
			loot: LootContainer {
				credits: 75,
				..LootContainer::default()
			},
		})
	}

	#[test]
	fn lethal_attack_wins_without_counter_damage() {
		let mut world = world();
		let enemy = spawn(&mut world, hostile(10, 50));
		world.engage(enemy).unwrap();

		let outcome = world.attack(10, &CombatRules::default()).unwrap();

		assert_eq!(
			outcome,
			AttackOutcome::Victory {
				dealt: 10,
				enemy: "Raider".into()
			}
		);
		assert_eq!(world.hull(), 100);
		assert_eq!(world.status(), Status::Space);
		assert!(world.object(enemy).is_none());
		assert_eq!(world.loot().map(|loot| loot.credits), Some(75));
	}

	#[test]
	fn exchange_is_simultaneous() {
		let mut world = world();
		let enemy = spawn(&mut world, hostile(30, 7));
		world.engage(enemy).unwrap();

		let outcome = world.attack(12, &CombatRules::default()).unwrap();

		assert_eq!(
			outcome,
			AttackOutcome::Exchanged {
				dealt: 12,
				taken: 7,
				enemy_hp: 18,
				hull: 93
			}
		);
		assert_eq!(world.status(), Status::Combat);
	}

	#[test]
	fn lethal_counter_damage_is_defeat() {
		let mut world = world();
		world.current_sector = SectorCoordinate::new(4, 1);
		world.hull = 5;
		world.cargo.add(Resource::Iron, 9);
		world.cargo.add(Resource::Gold, 4);
		let enemy = spawn(&mut world, hostile(100, 5));
		world.engage(enemy).unwrap();

		let outcome = world.attack(1, &CombatRules::default()).unwrap();

		assert_eq!(outcome, AttackOutcome::Defeat { dealt: 1, taken: 5 });
		assert_eq!(world.hull(), 0);
		assert_eq!(world.status(), Status::Hangar);
		assert_eq!(world.current_sector(), HOME);
		assert_eq!(world.cargo().get(Resource::Iron), 4);
		assert_eq!(world.cargo().get(Resource::Gold), 2);
		assert!(world.local_objects().is_empty());
		assert_eq!(world.loot(), None);
	}

	#[test]
	fn failed_flee_costs_a_hit() {
		let mut world = world();
		let enemy = spawn(&mut world, hostile(30, 8));
		world.engage(enemy).unwrap();

		assert_eq!(
			world.flee(false, &CombatRules::default()),
			Ok(FleeOutcome::Caught { taken: 8, hull: 92 })
		);
		assert_eq!(world.status(), Status::Combat);

		assert_eq!(world.flee(true, &CombatRules::default()), Ok(FleeOutcome::Escaped));
		assert_eq!(world.status(), Status::Space);
		assert_eq!(world.loot(), None);
		assert!(world.object(enemy).is_some());
	}

	#[test]
	fn failed_flee_can_be_fatal() {
		let mut world = world();
		world.current_sector = SectorCoordinate::new(-2, 3);
		world.hull = 8;
		world.cargo.add(Resource::Iron, 10);
		world.grant_loot(LootContainer {
			credits: 40,
			..LootContainer::default()
		});
		let enemy = spawn(&mut world, hostile(30, 8));
		world.engage(enemy).unwrap();

		assert_eq!(world.flee(false, &CombatRules::default()), Ok(FleeOutcome::Defeat { taken: 8 }));
		assert_eq!(world.hull(), 0);
		assert_eq!(world.status(), Status::Hangar);
		assert_eq!(world.current_sector(), HOME);
		assert_eq!(world.cargo().get(Resource::Iron), 5);
		assert!(world.local_objects().is_empty());
		assert_eq!(world.loot(), None);
		assert_eq!(world.credits(), 500);
	}

	#[test]
	fn only_hostiles_can_be_engaged() {
		let mut world = world();
		let station = spawn(&mut world, ObjectKind::Station);

		assert_eq!(world.engage(station), Err(InvariantViolation::NotHostile(station).into()));
		assert_eq!(
			world.attack(5, &CombatRules::default()),
			Err(InvariantViolation::Status { actual: Status::Space }.into())
		);
	}
}
