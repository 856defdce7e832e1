//! Register management for the backend

mod allocator;

pub use allocator::{Eviction, Location, Placement, RegisterAllocator};
