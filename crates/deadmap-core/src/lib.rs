//! Core pipeline logic for the deadmap-check run-continuity validator
//!
//! Resolves run metadata from bookkeeping, selects a representative EPN
//! subset of the run's CTFs, drives the external dead-map builder over it,
//! reconstructs the orbit series from the captured workflow log, classifies
//! continuity from the gap statistics, and finishes with a bounded-time QA
//! macro invocation.

pub mod bookkeeping;
pub mod chunks;
pub mod config;
pub mod context;
pub mod error;
pub mod listing;
pub mod logging;
pub mod orbits;
pub mod pipeline;
pub mod plot;
pub mod qa;
pub mod workflow;
