#![forbid(unsafe_code)]

//! Mutation-contract model shared by the operator side and the golden-test
//! harness: cluster partitions, write intents, allow-lists, validation and
//! the equivalence engine.

mod allowed;
mod cluster;
mod controllers;
pub mod equivalence;
mod intent;
pub mod matcher;
mod mutation_set;
mod resource;
pub mod validation;

pub use allowed::*;
pub use cluster::*;
pub use controllers::*;
pub use intent::*;
pub use mutation_set::*;
pub use resource::*;
