//! Services module
//!
//! Business logic services that coordinate between routes and storage.

pub mod forms;

pub use forms::FormService;
