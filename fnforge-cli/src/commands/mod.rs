//! Command implementations

pub mod cache;
pub mod check;
pub mod run;
pub mod synth;
