//! Adapters between the outside world and the workflow: scenario files in,
//! CSV reports out.

pub mod csv;
pub mod json;
