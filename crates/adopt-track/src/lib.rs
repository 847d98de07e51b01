//! Core library for the shelter adoption platform.
//!
//! The heart of the crate is [`workflows::adoption`]: the coordinated state
//! machine that takes a candidate from a submitted application, through
//! interviews and the legal agreement, into the recurring post-adoption
//! reporting cadence. Everything else (config, telemetry, error surface) is
//! the ambient plumbing the HTTP service builds on.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
