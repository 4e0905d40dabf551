//! PrimePass settings library
//!
//! Environment-layered settings for the PrimePass backend: a typed base,
//! development and production overlays, the route table and the periodic
//! job table. Resolution happens once at startup; the result is immutable.

pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod format;
pub mod logging;
pub mod reporting;
pub mod routes;
pub mod schedule;
