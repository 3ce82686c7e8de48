//! Simulation scopes for task trees.
//!
//! A [`SimulatedTaskTree`] suspends the live trace and the world state,
//! lets speculative calls record into a detached tree, and puts both back
//! when it goes out of scope.
//!
//! # Modules
//!
//! - [`world`]: WorldState collaborator trait and the reference SimWorld
//! - [`visual`]: Visualizer collaborator trait
//! - [`scope`]: SimulatedTaskTree scope guard

pub mod scope;
pub mod visual;
pub mod world;

pub use scope::SimulatedTaskTree;
pub use visual::{LogVisualizer, NoVisualizer, VisualizationError, Visualizer};
pub use world::{Pose, SimWorld, WorldData, WorldState};
