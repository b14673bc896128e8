//! Travel over the sector lattice. A warp may cover any cell within `jump_range` on both axes, so diagonal jumps
//! cost the same as straight ones and distance is Chebyshev.

use crate::SectorCoordinate;
use std::cmp::Ordering;

pub fn grid_distance(a: SectorCoordinate, b: SectorCoordinate) -> u64 {
	a.x.abs_diff(b.x).max(a.y.abs_diff(b.y))
}

/// The furthest reachable sector toward `destination`, stepping each axis independently by at most `jump_range`.
///
/// Greedy, but since the longer axis shrinks by a full `jump_range` every hop the course still takes the fewest
/// possible hops.
pub fn next_hop(current: SectorCoordinate, destination: SectorCoordinate, jump_range: u32) -> SectorCoordinate {
	let range = i64::from(jump_range);

	SectorCoordinate::new(
		step(current.x, destination.x, range),
		step(current.y, destination.y, range),
	)
}

/// Moves `from` toward `to` by at most `range`. Never overshoots, so no intermediate value leaves `i64`.
fn step(from: i64, to: i64, range: i64) -> i64 {
	match from.cmp(&to) {
		Ordering::Less => to.min(from.saturating_add(range)),
		Ordering::Greater => to.max(from.saturating_sub(range)),
		Ordering::Equal => to,
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Course {
	Direct { target: SectorCoordinate },
	MultiHop { target: SectorCoordinate, destination: SectorCoordinate },
}

pub fn plan(current: SectorCoordinate, destination: SectorCoordinate, jump_range: u32) -> Course {
	match grid_distance(current, destination) <= u64::from(jump_range) {
		true => Course::Direct { target: destination },
		false => Course::MultiHop {
			target: next_hop(current, destination, jump_range),
			destination,
		},
	}
}
