//! Loader for configurations split across several files.
//!
//! A file may name other files in `include`, relative to its own directory.
//! Included files may include further files. Every top-level section must
//! come from exactly one file; a section defined twice is an error rather
//! than a silent merge.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use toml::map::Map;

/// Reads `path` and every file it includes into one validated [`Config`].
pub(crate) async fn load(path: &Path) -> Result<Config, ConfigError> {
	let mut visited = HashSet::new();
	let mut owners: HashMap<String, PathBuf> = HashMap::new();
	let mut merged = Map::new();
	let mut pending = VecDeque::from([existing(path)?]);

	while let Some(file) = pending.pop_front() {
		let canonical = file.canonicalize()?;
		if !visited.insert(canonical.clone()) {
			return Err(ConfigError::Validation(format!(
				"Circular include: {} was already loaded",
				canonical.display()
			)));
		}

		let content = resolve_env_vars(&tokio::fs::read_to_string(&file).await?)?;
		let mut sections: Map<String, toml::Value> = toml::from_str(&content)?;
		let dir = file.parent().unwrap_or_else(|| Path::new("."));

		if let Some(include) = sections.remove("include") {
			for name in include_list(include)? {
				pending.push_back(existing(&dir.join(name))?);
			}
		}

		for (section, value) in sections {
			if let Some(first) = owners.get(&section) {
				return Err(ConfigError::Validation(format!(
					"Duplicate section '{}' in {} and {}",
					section,
					first.display(),
					file.display()
				)));
			}
			owners.insert(section.clone(), file.clone());
			merged.insert(section, value);
		}
	}

	// Re-serialize so that the combined document goes through FromStr
	// validation like a single file would.
	toml::to_string(&merged)
		.map_err(|e| ConfigError::Parse(format!("Failed to combine configuration: {}", e)))?
		.parse()
}

fn include_list(value: toml::Value) -> Result<Vec<String>, ConfigError> {
	match value {
		toml::Value::String(name) => Ok(vec![name]),
		toml::Value::Array(items) => items
			.into_iter()
			.map(|item| match item {
				toml::Value::String(name) => Ok(name),
				_ => Err(ConfigError::Validation(
					"include entries must be strings".into(),
				)),
			})
			.collect(),
		_ => Err(ConfigError::Validation(
			"include must be a string or an array of strings".into(),
		)),
	}
}

fn existing(path: &Path) -> Result<PathBuf, ConfigError> {
	if path.exists() {
		Ok(path.to_path_buf())
	} else {
		Err(ConfigError::Io(std::io::Error::new(
			std::io::ErrorKind::NotFound,
			format!("Configuration file not found: {}", path.display()),
		)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tests::BASE_CONFIG;
	use std::fs;
	use tempfile::TempDir;

	async fn load_err(dir: &TempDir, file: &str) -> String {
		load(&dir.path().join(file)).await.unwrap_err().to_string()
	}

	#[tokio::test]
	async fn test_single_file_config() {
		let dir = TempDir::new().unwrap();
		fs::write(dir.path().join("config.toml"), BASE_CONFIG).unwrap();

		let config = load(&dir.path().join("config.toml")).await.unwrap();
		assert_eq!(config.handoff.id, "handoff-test");
	}

	#[tokio::test]
	async fn test_sections_split_across_nested_includes() {
		let dir = TempDir::new().unwrap();
		let split = BASE_CONFIG.find("[chain]").unwrap();
		let (handoff, backends) = BASE_CONFIG.split_at(split);
		let storage = backends.find("[storage]").unwrap();
		let (chain_and_account, storage) = backends.split_at(storage);

		fs::create_dir(dir.path().join("parts")).unwrap();
		fs::write(
			dir.path().join("main.toml"),
			format!("include = [\"parts/backends.toml\"]\n{}", handoff),
		)
		.unwrap();
		fs::write(
			dir.path().join("parts/backends.toml"),
			format!("include = \"storage.toml\"\n{}", chain_and_account),
		)
		.unwrap();
		fs::write(dir.path().join("parts/storage.toml"), storage).unwrap();

		let config = load(&dir.path().join("main.toml")).await.unwrap();
		assert_eq!(config.handoff.chain_id, 31337);
		assert_eq!(config.chain.primary, "local");
		assert_eq!(config.storage.primary, "memory");
	}

	#[tokio::test]
	async fn test_duplicate_section_error() {
		let dir = TempDir::new().unwrap();
		fs::write(
			dir.path().join("main.toml"),
			"include = [\"other.toml\"]\n[handoff]\nid = \"node-a\"\n",
		)
		.unwrap();
		fs::write(dir.path().join("other.toml"), "[handoff]\nid = \"node-b\"\n").unwrap();

		assert!(load_err(&dir, "main.toml")
			.await
			.contains("Duplicate section 'handoff'"));
	}

	#[tokio::test]
	async fn test_self_include_detection() {
		let dir = TempDir::new().unwrap();
		fs::write(
			dir.path().join("self.toml"),
			"include = [\"self.toml\"]\n[handoff]\nid = \"node-a\"\n",
		)
		.unwrap();

		assert!(load_err(&dir, "self.toml").await.contains("already loaded"));
	}

	#[tokio::test]
	async fn test_missing_include_reported() {
		let dir = TempDir::new().unwrap();
		fs::write(dir.path().join("main.toml"), "include = \"nowhere.toml\"\n").unwrap();

		assert!(load_err(&dir, "main.toml")
			.await
			.contains("Configuration file not found"));
	}

	#[tokio::test]
	async fn test_non_string_include_rejected() {
		let dir = TempDir::new().unwrap();
		fs::write(dir.path().join("main.toml"), "include = [1]\n").unwrap();

		assert!(load_err(&dir, "main.toml").await.contains("must be strings"));
	}
}
