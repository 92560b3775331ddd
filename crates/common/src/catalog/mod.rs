//! Dish catalog - read-only knowledge-base lookup
//!
//! The catalog owns the full dish records and the name -> id mapping used to
//! resolve dish names returned by the completion service. It is loaded once
//! at startup and never mutated by the pipeline.

use crate::errors::{AppError, Result};
use crate::models::Dish;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Read-only dish catalog
#[derive(Debug, Clone, Default)]
pub struct DishCatalog {
    dishes: HashMap<u32, Dish>,
    ids_by_name: HashMap<String, u32>,
}

/// On-disk catalog format
#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    dishes: Vec<Dish>,
}

impl DishCatalog {
    /// Build a catalog from dish records.
    ///
    /// Name lookup is case-insensitive; duplicate names keep the first id
    /// seen and log the collision.
    pub fn new(dishes: Vec<Dish>) -> Self {
        let mut by_id = HashMap::with_capacity(dishes.len());
        let mut by_name = HashMap::with_capacity(dishes.len());

        for dish in dishes {
            match by_name.entry(normalize_name(&dish.name)) {
                std::collections::hash_map::Entry::Vacant(e) => {
                    e.insert(dish.id);
                }
                std::collections::hash_map::Entry::Occupied(e) => {
                    tracing::warn!(
                        name = %dish.name,
                        kept_id = e.get(),
                        dropped_id = dish.id,
                        "Duplicate dish name in catalog, keeping first id"
                    );
                }
            }
            by_id.insert(dish.id, dish);
        }

        Self {
            dishes: by_id,
            ids_by_name: by_name,
        }
    }

    /// Load the catalog from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| AppError::Configuration {
            message: format!("Failed to read catalog {}: {}", path.display(), e),
        })?;
        let file: CatalogFile = serde_json::from_str(&raw)?;
        tracing::info!(path = %path.display(), dishes = file.dishes.len(), "Loaded dish catalog");
        Ok(Self::new(file.dishes))
    }

    /// Look up a dish record by id
    pub fn get(&self, id: u32) -> Option<&Dish> {
        self.dishes.get(&id)
    }

    /// Resolve a dish name to its id (case-insensitive, trimmed)
    pub fn id_for_name(&self, name: &str) -> Option<u32> {
        self.ids_by_name.get(&normalize_name(name)).copied()
    }

    /// Number of dishes in the catalog
    pub fn len(&self) -> usize {
        self.dishes.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.dishes.is_empty()
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dish(id: u32, name: &str) -> Dish {
        Dish {
            id,
            name: name.to_string(),
            restaurant: "The Event Horizon".into(),
            planet: None,
            chef: None,
            ingredients: vec![],
            techniques: vec![],
            description: None,
        }
    }

    #[test]
    fn test_lookup_by_id_and_name() {
        let catalog = DishCatalog::new(vec![dish(1, "Nebula Risotto"), dish(2, "Plasma Tart")]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(2).map(|d| d.name.as_str()), Some("Plasma Tart"));
        assert_eq!(catalog.id_for_name("  nebula risotto "), Some(1));
        assert_eq!(catalog.id_for_name("Unknown Dish"), None);
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let catalog = DishCatalog::new(vec![dish(1, "Plasma Tart"), dish(2, "Plasma Tart")]);
        assert_eq!(catalog.id_for_name("Plasma Tart"), Some(1));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let json = serde_json::json!({
            "dishes": [{
                "id": 11,
                "name": "Quantum Gnocchi",
                "restaurant": "Singularity Bistro",
                "planet": "Krypton",
                "chef": "Vexel",
                "ingredients": ["void flour"],
                "techniques": ["entangled kneading"],
                "description": "Gnocchi in two places at once."
            }]
        });
        std::fs::write(&path, serde_json::to_string(&json).unwrap()).unwrap();

        let catalog = DishCatalog::from_json_file(&path).unwrap();
        assert_eq!(catalog.id_for_name("Quantum Gnocchi"), Some(11));
        assert_eq!(
            catalog.get(11).and_then(|d| d.planet.as_deref()),
            Some("Krypton")
        );
    }
}
