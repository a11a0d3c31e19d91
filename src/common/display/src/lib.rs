//! Display and visualization utilities for Ontic.
//!
//! Provides formatting for query trees and their explanations.

mod tree;

pub use tree::{DisplayTree, TreeNode};
