//! Report execution for rental-lens.
//!
//! Runs catalog entries and ad-hoc SQL against the read-only datastore,
//! refusing writes before they reach it.

mod executor;

pub use executor::{QueryOutcome, QueryRunner, QuerySource};
