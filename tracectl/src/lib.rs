// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Runtime control of tracing for the attachment reconciler crates.
//!
//! Every crate declares its tracing target with [`trace_target!`]. Targets are collected at link
//! time and their levels can be changed at runtime through [`TracingControl`], by target name or
//! by tag.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc)]

pub mod control;
pub mod targets;

pub use control::{TargetCfg, TraceCtlError, TracingControl, get_trace_ctl};
pub use tracing_subscriber::filter::LevelFilter;
