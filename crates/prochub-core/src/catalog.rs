use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::types::ProcessDef;

/// The full set of process definitions, keyed by logical name. Loaded and
/// saved wholesale; insertion order is irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
	pub definitions: BTreeMap<String, ProcessDef>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
	#[error("failed to read catalog file: {0}")]
	Io(#[from] std::io::Error),

	#[error("invalid catalog JSON: {0}")]
	Parse(#[from] serde_json::Error),

	#[error("process {0} has an empty command")]
	EmptyCommand(String),
}

impl Catalog {
	pub fn load(path: &Path) -> Result<Self, CatalogError> {
		let data = std::fs::read_to_string(path)?;
		let catalog: Catalog = serde_json::from_str(&data)?;
		catalog.validate()?;
		tracing::info!("{} process definitions loaded", catalog.definitions.len());
		Ok(catalog)
	}

	pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
		let data = serde_json::to_string_pretty(self)?;
		std::fs::write(path, data)?;
		tracing::info!("{} process definitions saved", self.definitions.len());
		Ok(())
	}

	/// Every definition must carry at least a program name in its command.
	pub fn validate(&self) -> Result<(), CatalogError> {
		for (name, def) in &self.definitions {
			if def.command.is_empty() {
				return Err(CatalogError::EmptyCommand(name.clone()));
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::path::PathBuf;

	fn sample() -> Catalog {
		let mut definitions = BTreeMap::new();
		definitions.insert(
			"echo1".to_string(),
			ProcessDef {
				dir: PathBuf::from("/"),
				command: vec!["echo".to_string(), "hello".to_string()],
			},
		);
		Catalog { definitions }
	}

	#[test]
	fn parses_catalog_json() {
		let json = r#"{"definitions": {"echo1": {"dir": "/", "command": ["echo", "hello"]}}}"#;
		let catalog: Catalog = serde_json::from_str(json).unwrap();
		assert_eq!(catalog, sample());
	}

	#[test]
	fn save_then_load_round_trips() {
		let path = std::env::temp_dir().join("prochub-catalog-roundtrip.json");
		let catalog = sample();
		catalog.save(&path).unwrap();
		let loaded = Catalog::load(&path).unwrap();
		assert_eq!(loaded, catalog);
		let _ = std::fs::remove_file(&path);
	}

	#[test]
	fn rejects_empty_command() {
		let mut catalog = sample();
		catalog.definitions.insert(
			"broken".to_string(),
			ProcessDef {
				dir: PathBuf::from("/"),
				command: vec![],
			},
		);
		assert!(matches!(
			catalog.validate(),
			Err(CatalogError::EmptyCommand(name)) if name == "broken"
		));
	}

	#[test]
	fn load_missing_file_is_io_error() {
		let path = std::env::temp_dir().join("prochub-catalog-does-not-exist.json");
		assert!(matches!(Catalog::load(&path), Err(CatalogError::Io(_))));
	}
}
