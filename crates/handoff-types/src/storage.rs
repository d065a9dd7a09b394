//! Storage-related types for the relayer service.

use std::str::FromStr;

/// Storage namespaces used by the relayer service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Settlement receipts keyed by namespaced transaction id
	Settlements,
	/// Committed engine events keyed by sequence number
	Events,
}

impl StorageKey {
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Settlements => "settlements",
			StorageKey::Events => "events",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Settlements, Self::Events].into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"settlements" => Ok(Self::Settlements),
			"events" => Ok(Self::Events),
			_ => Err(()),
		}
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_storage_key_round_trips_through_str() {
		for key in StorageKey::all() {
			assert_eq!(StorageKey::from_str(key.as_str()), Ok(key));
		}
		assert!(StorageKey::from_str("orders").is_err());
	}
}
