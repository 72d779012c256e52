//! Domain layer: value types, the pure pricing and policy engines, and the
//! workflow state machine. Nothing here performs I/O.

pub mod approval;
pub mod channels;
pub mod charges;
pub mod customer;
pub mod money;
pub mod ports;
pub mod rates;
pub mod service;
pub mod verification;
pub mod workflow;
