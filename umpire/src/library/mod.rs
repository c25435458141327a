pub mod builtin;
pub mod schema;

// Re-export for convenience
pub use builtin::{builtin_library, load_library_from_file};
pub use schema::*;
