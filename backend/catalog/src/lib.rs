//! # Catalog
//!
//! Shared records and wire payloads for the elective registration platform.
//!
//! The server persists [`models`] and speaks [`payloads`]; the upload CLI in
//! `process` reuses the payloads so both ends agree on field names.
//!
//! ## Slots
//!
//! A slot is `(semester, electiveType, electiveNumber)`. Several electives of
//! a branch may share a slot; a student holds at most one registration per
//! slot.
//!
//! - professional: electiveNumber 1 to 6
//! - open: electiveNumber 1 to 3

pub mod models;
pub mod payloads;

pub use models::{
    Admin, AdminRole, Branch, Elective, ElectiveRangeError, ElectiveType, Registration, Role,
    SelectedElective, Slot, Student,
};
