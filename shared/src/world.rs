use crate::cargo::{Cargo, Resource};
use crate::error::{InsufficientResource, InvariantViolation, WorldError};
use crate::item::{Equipment, Item};
use crate::navigation::{self, grid_distance, Course};
use crate::object::{LootContainer, ObjectId, ObjectKind, SpaceObject};
use crate::sector::{SectorResources, SectorType};
use crate::{SectorCoordinate, HOME};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::{fmt, fmt::Display, fmt::Formatter};

/// Which subsystem currently owns the player's attention.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
	#[default]
	Hangar,
	Map,
	Space,
	Mining,
	Combat,
	Warping,
}

impl Display for Status {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Status::Hangar => "docked in the hangar",
			Status::Map => "viewing the map",
			Status::Space => "in space",
			Status::Mining => "mining",
			Status::Combat => "in combat",
			Status::Warping => "warping",
		})
	}
}

/// The ship class a new profile starts with.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ShipSpec {
	pub max_fuel: u32,
	pub max_hull: u32,
	pub cargo_capacity: u32,
	pub jump_range: u32,
	pub starting_credits: u64,
}

impl Default for ShipSpec {
	fn default() -> Self {
		Self {
			max_fuel: 100,
			max_hull: 100,
			cargo_capacity: 200,
			jump_range: 3,
			starting_credits: 500,
		}
	}
}

/// The part of [`WorldState`] that survives between sessions.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PersistentState {
	pub credits: u64,
	pub fuel: u32,
	pub max_fuel: u32,
	pub hull: u32,
	pub max_hull: u32,
	pub current_sector: SectorCoordinate,
	pub cargo: Cargo,
	pub visited_sectors: HashSet<SectorCoordinate>,
	pub inventory: Vec<Item>,
	pub equipped: Equipment,
}

/// Everything the player has and where they are. One per session, read by the presentation layer and written only
/// through the operations defined on it, each of which validates before it mutates.
#[derive(Clone, Debug, Serialize)]
pub struct WorldState {
	pub(crate) credits: u64,
	pub(crate) fuel: u32,
	pub(crate) max_fuel: u32,
	pub(crate) hull: u32,
	pub(crate) max_hull: u32,

	pub(crate) current_sector: SectorCoordinate,
	pub(crate) visited_sectors: HashSet<SectorCoordinate>,

	pub(crate) cargo: Cargo,
	pub(crate) base_cargo: u32,
	pub(crate) base_jump_range: u32,
	pub(crate) inventory: Vec<Item>,
	pub(crate) equipped: Equipment,

	pub(crate) local_objects: Vec<SpaceObject>,
	pub(crate) sector_resources: SectorResources,
	pub(crate) current_sector_type: SectorType,
	#[serde(skip)]
	pub(crate) depletion: HashMap<SectorCoordinate, SectorResources>,
	#[serde(skip)]
	pub(crate) next_object_id: u32,

	pub(crate) status: Status,
	pub(crate) target_sector: Option<SectorCoordinate>,
	pub(crate) final_destination: Option<SectorCoordinate>,

	pub(crate) engagement: Option<ObjectId>,
	pub(crate) mining_target: Option<ObjectId>,
	pub(crate) loot: Option<LootContainer>,
}

impl WorldState {
	pub fn new(ship: &ShipSpec) -> Self {
		Self {
			credits: ship.starting_credits,
			fuel: ship.max_fuel,
			max_fuel: ship.max_fuel,
			hull: ship.max_hull,
			max_hull: ship.max_hull,

			current_sector: HOME,
			visited_sectors: HashSet::from([HOME]),

			cargo: Cargo::default(),
			base_cargo: ship.cargo_capacity,
			base_jump_range: ship.jump_range,
			inventory: vec![],
			equipped: Equipment::default(),

			local_objects: vec![],
			sector_resources: SectorResources::default(),
			current_sector_type: SectorType::Station,
			depletion: HashMap::new(),
			next_object_id: 0,

			status: Status::Hangar,
			target_sector: None,
			final_destination: None,

			engagement: None,
			mining_target: None,
			loot: None,
		}
	}

	pub fn credits(&self) -> u64 {
		self.credits
	}

	pub fn fuel(&self) -> u32 {
		self.fuel
	}

	pub fn max_fuel(&self) -> u32 {
		self.max_fuel
	}

	pub fn hull(&self) -> u32 {
		self.hull
	}

	pub fn max_hull(&self) -> u32 {
		self.max_hull
	}

	pub fn current_sector(&self) -> SectorCoordinate {
		self.current_sector
	}

	pub fn visited_sectors(&self) -> &HashSet<SectorCoordinate> {
		&self.visited_sectors
	}

	pub fn cargo(&self) -> &Cargo {
		&self.cargo
	}

	pub fn max_cargo(&self) -> u32 {
		self.base_cargo + self.equipped.cargo_capacity()
	}

	pub fn free_cargo(&self) -> u32 {
		self.max_cargo().saturating_sub(self.cargo.total())
	}

	pub fn inventory(&self) -> &[Item] {
		&self.inventory
	}

	pub fn equipped(&self) -> &Equipment {
		&self.equipped
	}

	pub fn jump_range(&self) -> u32 {
		self.equipped.jump_range().unwrap_or(self.base_jump_range)
	}

	pub fn local_objects(&self) -> &[SpaceObject] {
		&self.local_objects
	}

	pub fn object(&self, id: ObjectId) -> Option<&SpaceObject> {
		self.local_objects.iter().find(|object| object.id == id)
	}

	pub fn sector_resources(&self) -> &SectorResources {
		&self.sector_resources
	}

	pub fn current_sector_type(&self) -> SectorType {
		self.current_sector_type
	}

	pub fn status(&self) -> Status {
		self.status
	}

	pub fn target_sector(&self) -> Option<SectorCoordinate> {
		self.target_sector
	}

	pub fn final_destination(&self) -> Option<SectorCoordinate> {
		self.final_destination
	}

	pub fn engagement(&self) -> Option<ObjectId> {
		self.engagement
	}

	pub fn mining_target(&self) -> Option<ObjectId> {
		self.mining_target
	}

	pub fn loot(&self) -> Option<&LootContainer> {
		self.loot.as_ref()
	}

	pub fn persistent(&self) -> PersistentState {
		PersistentState {
			credits: self.credits,
			fuel: self.fuel,
			max_fuel: self.max_fuel,
			hull: self.hull,
			max_hull: self.max_hull,
			current_sector: self.current_sector,
			cargo: self.cargo.clone(),
			visited_sectors: self.visited_sectors.clone(),
			inventory: self.inventory.clone(),
			equipped: self.equipped.clone(),
		}
	}

	/// Replaces progress with a loaded profile. Transient sector state is dropped since the sector will be
	/// entered again.
	pub fn restore(&mut self, state: PersistentState) {
		let PersistentState {
			credits,
			fuel,
			max_fuel,
			hull,
			max_hull,
			current_sector,
			cargo,
			mut visited_sectors,
			inventory,
			equipped,
		} = state;

		visited_sectors.insert(HOME);

		self.credits = credits;
		self.max_fuel = max_fuel.max(1);
		self.fuel = fuel.min(self.max_fuel);
		self.max_hull = max_hull.max(1);
		self.hull = hull.min(self.max_hull);
		self.current_sector = current_sector;
		self.visited_sectors = visited_sectors;
		self.cargo = cargo;
		self.inventory = inventory;
		self.equipped = equipped;

		self.local_objects.clear();
		self.depletion.clear();
		self.status = match current_sector.is_home() {
			true => Status::Hangar,
			false => Status::Space,
		};
		self.target_sector = None;
		self.final_destination = None;
		self.engagement = None;
		self.mining_target = None;
		self.loot = None;
	}

	pub(crate) fn require(&self, allowed: &[Status]) -> Result<(), InvariantViolation> {
		match allowed.contains(&self.status) {
			true => Ok(()),
			false => Err(InvariantViolation::Status { actual: self.status }),
		}
	}

	pub(crate) fn remove_object(&mut self, id: ObjectId) -> Option<SpaceObject> {
		let index = self.local_objects.iter().position(|object| object.id == id)?;
		Some(self.local_objects.remove(index))
	}

	/// Records `sector` as visited, returning whether it is new.
	pub fn mark_visited(&mut self, sector: SectorCoordinate) -> bool {
		self.visited_sectors.insert(sector)
	}

	/// What is left of `sector` this session, given its durable record.
	pub fn resources_for(&self, sector: SectorCoordinate, durable: &SectorResources) -> SectorResources {
		self.depletion.get(&sector).copied().unwrap_or(*durable)
	}

	/// Installs a freshly scanned sector. Returns false, writing nothing, if the player has already moved on.
	pub fn populate_sector(
		&mut self,
		sector: SectorCoordinate,
		kind: SectorType,
		resources: SectorResources,
		objects: Vec<ObjectKind>,
	) -> bool {
		if self.current_sector != sector {
			debug!("discarding scan of {sector}, player is now at {}", self.current_sector);
			return false;
		}

		self.current_sector_type = kind;
		self.sector_resources = resources;
		self.local_objects = objects
			.into_iter()
			.map(|kind| {
				self.next_object_id += 1;
				SpaceObject {
					id: ObjectId::new(self.next_object_id),
					kind,
				}
			})
			.collect();

		true
	}

	/// Drops everything cached about `sector` after its record could not be resolved, leaving an empty wild sector.
	pub fn forget_sector(&mut self, sector: SectorCoordinate) -> bool {
		if self.current_sector != sector {
			return false;
		}

		self.current_sector_type = SectorType::default();
		self.sector_resources = SectorResources::default();
		self.local_objects.clear();
		true
	}

	pub fn open_map(&mut self) -> Result<(), WorldError> {
		self.require(&[Status::Space])?;
		self.status = Status::Map;
		Ok(())
	}

	pub fn close_map(&mut self) -> Result<(), WorldError> {
		self.require(&[Status::Map])?;
		self.status = Status::Space;
		Ok(())
	}

	pub fn dock(&mut self) -> Result<(), WorldError> {
		self.require(&[Status::Space])?;

		if !self.local_objects.iter().any(|object| object.kind == ObjectKind::Station) {
			return Err(InvariantViolation::NoStation.into());
		}

		self.status = Status::Hangar;
		Ok(())
	}

	pub fn undock(&mut self) -> Result<(), WorldError> {
		self.require(&[Status::Hangar])?;

		if self.hull == 0 {
			return Err(InsufficientResource::Hull.into());
		}

		self.status = Status::Space;
		Ok(())
	}

	pub fn plot_course(&mut self, destination: SectorCoordinate) -> Result<Course, WorldError> {
		self.require(&[Status::Space, Status::Map, Status::Hangar])?;

		if destination == self.current_sector {
			return Err(InvariantViolation::AlreadyThere(destination).into());
		}

		let course = navigation::plan(self.current_sector, destination, self.jump_range());
		(self.target_sector, self.final_destination) = match course {
			Course::Direct { target } => (Some(target), None),
			Course::MultiHop { target, destination } => (Some(target), Some(destination)),
		};

		Ok(course)
	}

	/// Validates the plotted hop and pays for it, returning the fuel spent. The caller owns the countdown.
	pub fn begin_warp(&mut self, fuel_per_sector: u32) -> Result<u32, WorldError> {
		self.require(&[Status::Space, Status::Map])?;

		let target = self.target_sector.ok_or(InvariantViolation::NoTarget)?;
		let distance = grid_distance(self.current_sector, target);
		let jump_range = self.jump_range();

		if distance > u64::from(jump_range) {
			return Err(InvariantViolation::OutOfRange { distance, jump_range }.into());
		}

		if self.hull == 0 {
			return Err(InsufficientResource::Hull.into());
		}

		// distance <= jump_range so this fits
		let cost = distance as u32 * fuel_per_sector;
		if cost > self.fuel {
			return Err(InsufficientResource::Fuel {
				needed: cost,
				available: self.fuel,
			}
			.into());
		}

		self.fuel -= cost;
		self.status = Status::Warping;
		Ok(cost)
	}

	/// Commits the plotted hop. If an autopilot destination is still ahead the next hop is plotted immediately and
	/// returned, the destination itself only clears on arrival.
	pub fn complete_warp(&mut self) -> Result<Option<SectorCoordinate>, WorldError> {
		let target = self.target_sector.ok_or(InvariantViolation::NoTarget)?;

		self.current_sector = target;
		self.local_objects.clear();
		self.loot = None;
		self.engagement = None;
		self.mining_target = None;
		self.status = Status::Space;

		self.target_sector = match self.final_destination {
			Some(destination) if destination != target => {
				Some(navigation::next_hop(target, destination, self.jump_range()))
			}
			_ => {
				self.final_destination = None;
				None
			}
		};

		Ok(self.target_sector)
	}

	/// Moves a floating container's contents into the loot container.
	pub fn open_container(&mut self, id: ObjectId) -> Result<(), WorldError> {
		self.require(&[Status::Space])?;

		match self.object(id).map(|object| &object.kind) {
			None => return Err(InvariantViolation::UnknownObject(id).into()),
			Some(ObjectKind::Container(_)) => {}
			Some(_) => return Err(InvariantViolation::NotContainer(id).into()),
		}

		if let Some(SpaceObject {
			kind: ObjectKind::Container(contents),
			..
		}) = self.remove_object(id)
		{
			self.loot.get_or_insert_with(LootContainer::default).merge(contents);
		}

		Ok(())
	}

	pub(crate) fn grant_loot(&mut self, loot: LootContainer) {
		if !loot.is_empty() {
			self.loot.get_or_insert_with(LootContainer::default).merge(loot);
		}
	}

	/// Claims as much of the loot container as fits. Resources that do not fit in the cargo hold stay behind.
	pub fn take_loot(&mut self) -> Result<LootContainer, WorldError> {
		self.require(&[Status::Space, Status::Hangar])?;

		let mut loot = self.loot.take().ok_or(InvariantViolation::NoLoot)?;
		let mut taken = LootContainer {
			credits: loot.credits,
			resources: Cargo::default(),
			items: std::mem::take(&mut loot.items),
		};

		self.credits += loot.credits;
		loot.credits = 0;
		self.inventory.extend(taken.items.iter().cloned());

		for resource in Resource::ALL {
			let quantity = loot.resources.get(resource).min(self.free_cargo());
			if quantity > 0 {
				loot.resources.take(resource, quantity);
				self.cargo.add(resource, quantity);
				taken.resources.add(resource, quantity);
			}
		}

		if !loot.is_empty() {
			self.loot = Some(loot);
		}

		Ok(taken)
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::object::Deposit;

	pub fn world() -> WorldState {
		let mut world = WorldState::new(&ShipSpec::default());
		world.status = Status::Space;
		world
	}

	pub fn spawn(world: &mut WorldState, kind: ObjectKind) -> ObjectId {
		world.next_object_id += 1;
		let id = ObjectId::new(world.next_object_id);
		world.local_objects.push(SpaceObject { id, kind });
		id
	}

	fn at(x: i64, y: i64) -> SectorCoordinate {
		SectorCoordinate::new(x, y)
	}

	#[test]
	fn direct_course_has_no_final_destination() {
		let mut world = world();

		world.plot_course(at(2, -3)).unwrap();

		assert_eq!(world.target_sector(), Some(at(2, -3)));
		assert_eq!(world.final_destination(), None);
	}

	#[test]
	fn autopilot_reaches_destination_exactly() {
		let mut world = world();
		world.base_jump_range = 3;

		world.plot_course(at(10, 0)).unwrap();
		assert_eq!(world.final_destination(), Some(at(10, 0)));
		assert_eq!(world.target_sector(), Some(at(3, 0)));

		let mut stops = vec![];
		for _ in 0..4 {
			world.begin_warp(1).unwrap();
			world.complete_warp().unwrap();
			stops.push((world.current_sector(), world.target_sector(), world.final_destination()));
		}

		assert_eq!(
			stops,
			vec![
				(at(3, 0), Some(at(6, 0)), Some(at(10, 0))),
				(at(6, 0), Some(at(9, 0)), Some(at(10, 0))),
				(at(9, 0), Some(at(10, 0)), Some(at(10, 0))),
				(at(10, 0), None, None),
			]
		);
		assert_eq!(world.fuel(), 90);
	}

	#[test]
	fn complete_warp_without_hop_is_rejected() {
		let mut world = world();
		let before = world.persistent();

		assert_eq!(world.complete_warp(), Err(InvariantViolation::NoTarget.into()));
		assert_eq!(world.persistent(), before);
	}

	#[test]
	fn warp_checks_range_and_fuel_before_spending() {
		let mut world = world();
		world.target_sector = Some(at(5, 0));
		assert_eq!(
			world.begin_warp(1),
			Err(InvariantViolation::OutOfRange {
				distance: 5,
				jump_range: 3
			}
			.into())
		);

		world.plot_course(at(2, 2)).unwrap();
		world.fuel = 1;
		assert_eq!(
			world.begin_warp(1),
			Err(InsufficientResource::Fuel { needed: 2, available: 1 }.into())
		);
		assert_eq!(world.status(), Status::Space);
		assert_eq!(world.fuel(), 1);
	}

	#[test]
	fn warping_twice_is_rejected() {
		let mut world = world();
		world.plot_course(at(1, 0)).unwrap();
		world.begin_warp(1).unwrap();

		assert_eq!(
			world.begin_warp(1),
			Err(InvariantViolation::Status {
				actual: Status::Warping
			}
			.into())
		);
	}

	#[test]
	fn restore_always_includes_home() {
		let mut world = world();
		let mut state = world.persistent();
		state.visited_sectors = HashSet::from([at(4, 4)]);
		state.current_sector = at(4, 4);
		state.hull = 900;

		world.restore(state);

		assert!(world.visited_sectors().contains(&HOME));
		assert_eq!(world.hull(), world.max_hull());
		assert_eq!(world.status(), Status::Space);
	}

	#[test]
	fn stale_scans_are_discarded() {
		let mut world = world();
		world.current_sector = at(1, 1);

		let station = || vec![ObjectKind::Station];

		assert!(!world.populate_sector(at(2, 2), SectorType::Wild, SectorResources::default(), station()));
		assert!(world.local_objects().is_empty());

		assert!(world.populate_sector(at(1, 1), SectorType::Station, SectorResources::default(), station()));
		assert_eq!(world.local_objects().len(), 1);
	}

	#[test]
	fn docking_needs_a_station() {
		let mut world = world();
		assert_eq!(world.dock(), Err(InvariantViolation::NoStation.into()));

		spawn(&mut world, ObjectKind::Station);
		world.dock().unwrap();
		assert_eq!(world.status(), Status::Hangar);

		world.hull = 0;
		assert_eq!(world.undock(), Err(InsufficientResource::Hull.into()));
	}

	#[test]
	fn loot_that_does_not_fit_stays_behind() {
		let mut world = world();
		world.base_cargo = 10;
		world.cargo.add(Resource::Iron, 4);

		let container = spawn(
			&mut world,
			ObjectKind::Container(LootContainer {
				credits: 25,
				resources: [(Resource::Gold, 9)].into_iter().collect(),
				items: vec![],
			}),
		);
		spawn(&mut world, ObjectKind::Asteroid(Deposit { resource: Resource::Iron, remaining: 3 }));

		world.open_container(container).unwrap();
		assert!(world.object(container).is_none());

		let taken = world.take_loot().unwrap();
		assert_eq!(taken.credits, 25);
		assert_eq!(taken.resources.get(Resource::Gold), 6);
		assert_eq!(world.cargo().total(), world.max_cargo());
		assert_eq!(world.loot().map(|loot| loot.resources.get(Resource::Gold)), Some(3));
		assert_eq!(world.credits(), 525);

		world.plot_course(at(1, 0)).unwrap();
		world.begin_warp(1).unwrap();
		world.complete_warp().unwrap();
		assert_eq!(world.loot(), None);
		assert_eq!(world.cargo().get(Resource::Gold), 6);
	}

	#[test]
	fn courses_to_the_edge_of_the_lattice_head_for_it() {
		let mut world = world();
		world.current_sector = at(-1, 0);

		world.plot_course(at(i64::MAX, 0)).unwrap();

		assert_eq!(world.target_sector(), Some(at(2, 0)));
		assert_eq!(world.final_destination(), Some(at(i64::MAX, 0)));
	}
}
