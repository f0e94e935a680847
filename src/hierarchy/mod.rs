//! Point-in-time snapshots of a directory hierarchy.
//!
//! A snapshot stores an arbitrary-branching tree with a left-child /
//! right-sibling encoding: each node knows only its first child and its next
//! sibling. Nodes live in an arena and refer to each other by [`NodeId`].

mod builder;
mod node;

pub use builder::{BuildError, HierarchyBuilder};
pub use node::Hierarchy;
use node::NodeId;
