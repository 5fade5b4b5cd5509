// Domain layer - identifiers, adapters and the logic that rotates and applies them
// Nothing in here talks to the OS directly; external systems sit behind ports

pub mod entities;
pub mod ports;
pub mod services;
