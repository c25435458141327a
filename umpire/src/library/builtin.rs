//! Built-in and external component catalogs.
//!
//! The default analog block catalog is embedded into the binary as JSON.
//! Users can supply their own catalog as a JSON file with the same shape.

use crate::library::schema::{Library, LibraryError, RoleVocabulary};
use std::path::Path;

const EMBEDDED_ANALOG_BLOCKS: &str = include_str!("../../library/analog_blocks.json");

/// Load the embedded analog block catalog.
pub fn builtin_library() -> Result<Library, LibraryError> {
    let library = Library::from_json_str(EMBEDDED_ANALOG_BLOCKS, &RoleVocabulary::default())?;
    tracing::debug!("Loaded {} built-in block types", library.len());
    Ok(library)
}

/// Load a catalog from a JSON file, validating roles against `vocabulary`.
pub fn load_library_from_file(
    path: &Path,
    vocabulary: &RoleVocabulary,
) -> Result<Library, LibraryError> {
    let content = std::fs::read_to_string(path)?;
    let library = Library::from_json_str(&content, vocabulary)?;
    tracing::info!("Loaded {} block types from {:?}", library.len(), path.file_name());
    Ok(library)
}
