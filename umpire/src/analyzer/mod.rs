pub mod feedback;
pub mod rules;
pub mod sanity;

// Re-export for convenience
pub use feedback::*;
pub use rules::*;
pub use sanity::*;
