//! Content source implementations

pub mod mock;

pub use mock::MockContentSource;
