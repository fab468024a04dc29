//! Testing utilities for exec sessions.
//!
//! Provides an in-memory [`ExecGateway`](crate::ExecGateway) whose shell is
//! driven by a script, so session behaviour can be exercised without a
//! container runtime.

pub mod scripted;

pub use scripted::{Reply, ScriptedGateway};
