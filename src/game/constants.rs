//! Game-rule constants.
//!
//! Values mirror the engine's published parameters; the tensor schema in
//! `percept` is sized against the maximum map dimensions.

/// Largest board width the engine generates.
pub const MAP_WIDTH_MAX: usize = 32;

/// Largest board height the engine generates.
pub const MAP_HEIGHT_MAX: usize = 32;

/// Research points required to collect coal.
pub const RESEARCH_COAL: u32 = 50;

/// Research points required to collect uranium.
pub const RESEARCH_URANIUM: u32 = 200;

/// Cargo capacity of a worker.
pub const WORKER_CARGO_CAPACITY: u32 = 100;

/// Cargo capacity of a cart.
pub const CART_CARGO_CAPACITY: u32 = 2000;

/// Upper bound on any entity's cooldown; city tiles have the longest.
pub const MAX_ACTION_COOLDOWN: i32 = 10;
