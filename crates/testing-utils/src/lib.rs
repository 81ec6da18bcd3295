//! # Inventory Testing Utils
//!
//! Shared testing utilities for the inventory pipeline workspace.
//!
//! - **Mock Repositories**: in-memory link registry and host store
//! - **Mock Source Client**: scripted vendor responses and failures
//! - **Test Data Builders**: host records and vendor payloads
//! - **Helpers**: polling utilities for asynchronous assertions
//!
//! Add this crate as a dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! inventory-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
