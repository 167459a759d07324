// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Configuration model for spoke/transit attachments. An [`AttachmentSpec`] is the declared
//! (desired) state of one attachment; it is validated and turned into an
//! [`AttachmentDescriptor`], the request sent to the controller. What the controller reports back
//! is an [`ObservedAttachment`]. Both are keyed by an [`AttachmentIdentity`].

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::struct_excessive_bools)]

pub mod aspath;
pub mod attachment;
pub mod descriptor;
pub mod errors;
pub mod identity;
pub mod observed;

pub use aspath::{AsPath, Asn}; // re-export
pub use attachment::{
    AttachmentSpec, AttachmentSpecBuilder, Direction, ImmutableField, MutableField, RetryPolicy,
    WanInterfaces,
}; // re-export
pub use descriptor::AttachmentDescriptor; // re-export
pub use errors::{ConfigError, ConfigResult, IdentityError, stringify}; // re-export
pub use identity::{AttachmentIdentity, IDENTITY_SEPARATOR}; // re-export
pub use observed::ObservedAttachment; // re-export

use tracectl::trace_target;
trace_target!("attach-config", LevelFilter::INFO, &["config"]);
