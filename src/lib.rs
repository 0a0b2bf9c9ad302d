//! Vetrina: a gallery listing service.
//!
//! Derives asset download URLs from per-asset content hashes plus a rotated,
//! upstream-supplied mapping routine, cached per gallery id with a bounded
//! TTL. The layers follow the usual split: `domain` holds types and
//! invariants, `application` the resolution services and the pure URL
//! derivation, `infra` the upstream fetch / script-evaluation / HTTP
//! adapters, `cache` the one piece of shared mutable state.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
