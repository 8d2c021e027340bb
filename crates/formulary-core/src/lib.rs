//! Core types for the formulary pipeline.
//!
//! Every artifact a pipeline stage produces lives here, together with the
//! tag enums they share and the static formula checks used by synthesis and
//! testing.

pub mod analysis;
pub mod definition;
pub mod enums;
pub mod error;
pub mod formula;
pub mod mapping;
pub mod score;
pub mod selection;
pub mod synthesis;
pub mod testing;
