use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::{fmt, fmt::Display, fmt::Formatter, num::ParseIntError, str::FromStr};
use thiserror::Error;

/// The home station. Always visited, never generated.
pub const HOME: SectorCoordinate = SectorCoordinate::new(0, 0);

/// A cell of the infinite sector lattice, keyed as `"x:y"` everywhere it is stored.
#[derive(Clone, Copy, Debug, DeserializeFromStr, Eq, Hash, Ord, PartialEq, PartialOrd, SerializeDisplay)]
pub struct SectorCoordinate {
	pub x: i64,
	pub y: i64,
}

impl SectorCoordinate {
	pub const fn new(x: i64, y: i64) -> Self {
		Self { x, y }
	}

	pub fn is_home(&self) -> bool {
		*self == HOME
	}
}

impl Display for SectorCoordinate {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.x, self.y)
	}
}

impl FromStr for SectorCoordinate {
	type Err = CoordinateParseError;

	fn from_str(string: &str) -> Result<Self, Self::Err> {
		let (x, y) = string
			.split_once(':')
			.ok_or_else(|| CoordinateParseError::MissingSeparator(string.into()))?;

		Ok(Self::new(x.trim().parse()?, y.trim().parse()?))
	}
}

#[derive(Debug, Error)]
pub enum CoordinateParseError {
	#[error("sector coordinate {0:?} is not of the form x:y")]
	MissingSeparator(Box<str>),

	#[error(transparent)]
	Axis(#[from] ParseIntError),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_and_displays_key() {
		let coordinate: SectorCoordinate = "-3:12".parse().unwrap();
		assert_eq!(coordinate, SectorCoordinate::new(-3, 12));
		assert_eq!(coordinate.to_string(), "-3:12");
	}

	#[test]
	fn rejects_malformed_keys() {
		assert!("3,4".parse::<SectorCoordinate>().is_err());
		assert!("a:4".parse::<SectorCoordinate>().is_err());
		assert!("".parse::<SectorCoordinate>().is_err());
	}

	#[test]
	fn home_is_origin() {
		assert!("0:0".parse::<SectorCoordinate>().unwrap().is_home());
		assert!(!SectorCoordinate::new(0, 1).is_home());
	}
}
