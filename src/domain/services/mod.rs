// Domain services contain the logic that doesn't belong to a single entity
// They orchestrate entities and reach the outside world only through ports

pub mod reconfiguration;
pub mod rotation;

pub use reconfiguration::*;
pub use rotation::*;
