//! Tripwire: fingerprints, the render event log, and artifact drift.

pub mod drift;
pub mod eventlog;
pub mod hasher;
