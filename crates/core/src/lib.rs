pub mod catalog;
pub mod config;
pub mod mapgen;
pub mod scene;
pub mod types;

pub use catalog::{Catalog, CatalogError};
pub use config::{ConfigError, ConnectorPolicy, GeneratorConfig};
pub use mapgen::{GenerationError, MapGenerator, Placement, generate_placement};
pub use types::*;
