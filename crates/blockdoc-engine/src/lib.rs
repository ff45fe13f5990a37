pub mod editing;
pub mod error;
pub mod export;
pub mod io;
pub mod registry;

// Re-export key types for easier usage
pub use editing::*;
pub use error::EngineError;
pub use export::{ExportFormat, export_document};
pub use io::{DocumentSnapshot, load, serialize};
pub use registry::{BlockDescriptor, BlockRegistry, DEFAULT_BLOCK, Rule};
