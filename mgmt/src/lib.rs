// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Management of spoke/transit gateway attachments.
//!
//! The [`Manager`] drives one attachment at a time through a [`controller::Controller`]: create
//! with bounded retries, read back, field-level update, delete and import. The
//! [`AttachmentTable`] keeps track of the attachments under management and plans what each
//! declaration requires.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc)]

pub mod errors;
pub mod import;
pub mod manager;
pub mod registry;
pub mod retry;

pub use errors::AttachmentError;
pub use manager::{AttachmentState, Manager, Presence};
pub use registry::{AttachmentTable, Plan};
pub use retry::{RetryFailure, RetryState, create_with_retry};

use tracectl::trace_target;
trace_target!("attach-mgmt", LevelFilter::INFO, &["mgmt"]);
