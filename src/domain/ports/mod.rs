pub mod agent;         // Privileged adapter configuration agent
pub mod process;       // System process execution
pub mod repository;    // Profile persistence abstraction
pub mod notification;  // User notification abstractions

pub use agent::*;
pub use process::*;
pub use repository::*;
pub use notification::*;
