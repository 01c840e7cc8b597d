//! Type definitions for the fraud routing pipeline

pub mod decision;
pub mod transaction;

pub use decision::{BranchDecision, Destination, RoutedRecord};
pub use transaction::Transaction;
