use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, fmt::Display, fmt::Formatter, str::FromStr};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Resource {
	Iron,
	Gold,
	DarkMatter,
}

impl Resource {
	pub const ALL: [Resource; 3] = [Resource::Iron, Resource::Gold, Resource::DarkMatter];

	pub fn name(&self) -> &'static str {
		match self {
			Resource::Iron => "iron",
			Resource::Gold => "gold",
			Resource::DarkMatter => "darkMatter",
		}
	}
}

impl Display for Resource {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for Resource {
	type Err = Box<str>;

	fn from_str(string: &str) -> Result<Self, Self::Err> {
		Resource::ALL
			.into_iter()
			.find(|resource| resource.name().eq_ignore_ascii_case(string))
			.ok_or_else(|| string.into())
	}
}

/// Resource quantities held by the ship or carried in a loot container.
///
/// Capacity is not known here; the owner checks [`Cargo::total`] against its limit before calling
/// [`Cargo::add`].
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Cargo(BTreeMap<Resource, u32>);

impl Cargo {
	pub fn get(&self, resource: Resource) -> u32 {
		self.0.get(&resource).copied().unwrap_or(0)
	}

	pub fn total(&self) -> u32 {
		self.0.values().sum()
	}

	pub fn is_empty(&self) -> bool {
		self.total() == 0
	}

	pub fn add(&mut self, resource: Resource, quantity: u32) {
		if quantity > 0 {
			*self.0.entry(resource).or_default() += quantity;
		}
	}

	/// Removes up to `quantity`, returning how much was actually removed.
	pub fn take(&mut self, resource: Resource, quantity: u32) -> u32 {
		let Some(held) = self.0.get_mut(&resource) else {
			return 0;
		};

		let taken = quantity.min(*held);
		*held -= taken;

		if *held == 0 {
			self.0.remove(&resource);
		}

		taken
	}

	pub fn iter(&self) -> impl Iterator<Item = (Resource, u32)> + '_ {
		self.0.iter().map(|(resource, quantity)| (*resource, *quantity))
	}
}

impl FromIterator<(Resource, u32)> for Cargo {
	fn from_iter<I: IntoIterator<Item = (Resource, u32)>>(iter: I) -> Self {
		let mut cargo = Cargo::default();
		for (resource, quantity) in iter {
			cargo.add(resource, quantity);
		}
		cargo
	}
}
