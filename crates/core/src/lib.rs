//! Pure domain logic for the media ingestion pipeline.
//!
//! This crate has no I/O: no database, no network, no filesystem. It
//! provides the composite tuple wire codec, the shape value type, the
//! tag bitsets with their quality gate, the shape reducer that computes
//! the denormalized `img_*` read fields, the crop geometry used by the
//! local transform engine, and the common metadata/result types shared
//! by all adapters.

pub mod composite;
pub mod crop;
pub mod error;
pub mod metadata;
pub mod naming;
pub mod reducer;
pub mod shape;
pub mod tags;
pub mod types;
