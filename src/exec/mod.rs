// src/exec/mod.rs

//! Task execution layer.
//!
//! The executor never looks inside a payload; it hands each ready task to a
//! [`TaskRunner`] and waits for an output or an error.
//!
//! - [`runner`] defines the `TaskRunner` trait and [`PayloadRunner`], the
//!   production implementation that dispatches on payload kind.
//! - [`http`] issues the request described by an HTTP payload.
//! - [`retry`] provides [`RetryingRunner`], an opt-in policy layer that
//!   re-invokes an inner runner according to the task's retry settings.

pub mod http;
pub mod retry;
pub mod runner;

pub use retry::RetryingRunner;
pub use runner::{PayloadRunner, RunFuture, TaskOutput, TaskRunner};
