//! Import orchestration: batch sequencing over the adapter registry,
//! plus shape and perceptual-hash regeneration for existing images.

pub mod importer;
pub mod regenerate;

pub use importer::Importer;
