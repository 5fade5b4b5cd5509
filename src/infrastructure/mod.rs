// Infrastructure layer - concrete implementations of domain ports
// This layer contains adapters that connect domain logic to external systems

// Core adapters organized by technology/responsibility
pub mod process;        // System process execution
pub mod powershell;     // PowerShell configuration agent channel
pub mod storage;        // JSON profile store
pub mod notification;   // Console/terminal user interaction

// Factories for creating adapter instances
pub mod factories;

// Re-export commonly used adapters
pub use process::*;
pub use powershell::*;
pub use storage::*;
pub use notification::*;
pub use factories::*;
