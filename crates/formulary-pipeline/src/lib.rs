//! The requirement-to-formula pipeline.
//!
//! Five stages run in order, each reading the artifacts of the ones before
//! it: [`analyzer`] → [`mapper`] → [`selector`] → [`synthesizer`] →
//! [`tester`]. Every stage has a fallible `try_*` entry point and an
//! infallible one that logs the failure and returns the artifact's fallback,
//! so a run never aborts halfway. [`pipeline::Pipeline`] chains them and
//! handles conversation memory; [`research`] and [`drafting`] are the
//! alternate, model-heavy orchestration paths.

pub mod analyzer;
pub mod drafting;
pub mod error;
pub mod extract;
pub mod mapper;
pub mod pipeline;
pub mod research;
pub mod selector;
pub mod synthesizer;
pub mod tester;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{Result, StageError};
pub use pipeline::{GenerationOutcome, Pipeline};
