//! Data models for the employee directory.
//!
//! - `Employee`: a stored record with its server-assigned id
//! - `NewEmployee`: the editable fields, used for create requests

pub mod employee;

pub use employee::{Employee, NewEmployee};
