//! Behavior-cloning irrigation controller: training-data assembly and
//! compilation of the trained model into a dense policy lookup table.
//!
//! Training:    episode logs → schema → normalizer → dataset → regression engine
//! Compilation: metadata + model → align → grid → synth → predict → postprocess

pub mod align;
pub mod compiler;
pub mod config;
pub mod csv;
pub mod dataset;
pub mod diagnostics;
pub mod error;
pub mod forest;
pub mod grid;
pub mod matrix;
pub mod merge;
pub mod meta;
pub mod normalizer;
pub mod policy;
pub mod policy_table;
pub mod postprocess;
pub mod predict;
pub mod regression;
pub mod rng;
pub mod schema;
pub mod store;
pub mod synth;
pub mod table;
pub mod trainer;
pub mod types;
