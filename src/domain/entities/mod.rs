pub mod adapter;
pub mod identifier;
pub mod profile;

pub use adapter::*;
pub use identifier::*;
pub use profile::*;
