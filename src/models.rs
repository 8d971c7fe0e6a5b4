mod index;
mod note;
mod path;
mod timestamp;

pub use index::GardenIndex;
pub use note::{Note, NoteBuilder, NoteRecord, SearchResult};
pub use path::{ExplorationPath, PathRecord};
