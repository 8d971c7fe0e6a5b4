pub mod agent;
pub mod config;
pub mod graph;
pub mod import;
pub mod markdown;
pub mod models;
pub mod ollama;
pub mod server;
pub mod service;
pub mod store;
pub mod summary;
pub mod utils;

pub use config::GardenConfig;
pub use models::{ExplorationPath, GardenIndex, Note, NoteBuilder, NoteRecord, PathRecord, SearchResult};
pub use service::GardenService;
pub use store::GardenStore;
