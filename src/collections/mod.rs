//! Small containers used as explicit work-lists by the tree algorithms.

mod stack;

pub use stack::Stack;
