//! Domain layer for the onboarding service.
//!
//! Everything in this crate is free of I/O: capture artifacts and the
//! signature state machine, form validation, the record assembler, and the
//! capability traits implemented by the persistence layer.

pub mod artifact;
pub mod assembler;
pub mod signature;
pub mod store;
pub mod types;
pub mod validate;
