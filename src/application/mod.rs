// Application layer - orchestrates domain logic for specific use cases
// This layer contains services that coordinate between domain and infrastructure

pub mod cli;
pub mod rotation;
pub mod selection;

// Re-export CLI components
pub use cli::*;
pub use rotation::*;
pub use selection::*;
