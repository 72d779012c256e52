//! Application layer orchestrating workflows over the domain ports.
//!
//! `WorkflowController` owns the session store and the external service
//! adapters, and serializes access to each workflow instance.

pub mod controller;
