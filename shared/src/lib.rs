pub mod cargo;
pub mod combat;
pub mod coordinate;
pub mod error;
pub mod hangar;
pub mod item;
pub mod mining;
pub mod navigation;
pub mod object;
pub mod sector;
pub mod world;

pub use coordinate::{SectorCoordinate, HOME};
pub use error::{InsufficientResource, InvariantViolation, WorldError};
pub use world::{PersistentState, ShipSpec, Status, WorldState};
