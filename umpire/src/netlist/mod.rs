pub mod candidate;
pub mod circuit;
pub mod schema;

// Re-export for convenience
pub use candidate::{extract_json_block, parse_candidate, CandidateError};
pub use circuit::{Attachment, Circuit, CircuitStats, NetMap};
pub use schema::{ComponentInstance, Goals, InputTopology};
