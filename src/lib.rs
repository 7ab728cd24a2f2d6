//! rental-lens - a catalog of SQL reports over the DVD rental schema and a
//! runner that executes them against an embedded, read-only datastore.
//!
//! This library exposes the core modules for the binary and integration tests.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod output;
pub mod runner;
pub mod safety;
