//! Domain types, access rules and the storage trait for Pacta, a
//! contract lifecycle service.
//!
//! This crate carries no HTTP or database dependencies. Everything with
//! IO lives behind [`store::ContractStore`], implemented elsewhere; the
//! access predicates, workflow transitions, wizard accumulator and
//! dashboard projection here are pure functions over loaded rows.

pub mod access;
pub mod approval;
pub mod audit;
pub mod contract;
pub mod dashboard;
pub mod error;
pub mod file;
pub mod record;
pub mod refdata;
pub mod share;
pub mod store;
pub mod user;
pub mod version;
pub mod wizard;
pub mod workflow;

pub use error::{Error, Result};
