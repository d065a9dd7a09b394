//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Each pluggable backend (chain, account, storage) exposes a Registry struct
/// that names the backend as it appears in TOML and hands out its factory.
pub trait ImplementationRegistry {
	/// Name used in configuration files, for example `"local"` under
	/// `[chain.implementations.local]` or `"memory"` under `[storage.implementations.memory]`.
	const NAME: &'static str;

	/// Factory function type for this backend family.
	type Factory;

	/// Returns the factory that builds this implementation from its config table.
	fn factory() -> Self::Factory;
}
