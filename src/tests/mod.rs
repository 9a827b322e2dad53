//! Crate-level test suites that exercise several modules at once.

mod property;
