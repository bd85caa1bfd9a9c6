//! Entities held in the test tree.
//!
//! - [`TestSuite`] - a test file with its discovered test functions
//! - [`TestCase`] - a single test function
//! - [`RunResult`] - the immutable outcome of one run attempt
//! - [`Status`] - derived display state, never stored
//!
//! Nodes are identified by a computed [`NodeKey`] (`location`, `name`) so that
//! a rediscovered function maps onto the same key as before.

mod node;
mod result;
mod status;

pub use node::{NodeKey, NodeRef, SourceRange, TestCase, TestSuite};
pub use result::RunResult;
pub use status::{Status, StatusSummary};
