//! Host implementations shipped with the core

pub mod memory;

pub use memory::{Delivery, Fault, GroupSnapshot, InMemoryHost};
