// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Boundary between the attachment reconciler and the remote network controller.
//!
//! The reconciler only ever talks to the controller through the [`Controller`] trait. How the
//! calls reach the controller (session, credentials, transport) is the implementor's business.
//! Every failure crossing this boundary is a [`ControllerError`] carrying an explicit
//! [`ErrorKind`].

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc)]

mod errors;
#[cfg(any(test, feature = "testing"))]
pub mod fake;

pub use errors::{ControllerError, ErrorKind, NOT_FOUND_MARKERS, TRANSIENT_MARKERS};

use config::{AsPath, AttachmentDescriptor, AttachmentIdentity, ObservedAttachment, WanInterfaces};
use std::fmt::Display;

use tracectl::trace_target;
trace_target!("attach-controller", LevelFilter::INFO, &["controller"]);

/// An in-place update of a single mutable attribute of an attachment.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldUpdate {
    InsaneModeTunnelNumber(u32),
}

impl FieldUpdate {
    /// The controller's name for the updated attribute.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            FieldUpdate::InsaneModeTunnelNumber(_) => "insane_mode_tunnel_number",
        }
    }
}

impl Display for FieldUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldUpdate::InsaneModeTunnelNumber(n) => write!(f, "{}={n}", self.name()),
        }
    }
}

/// The calls the reconciler needs from a network controller.
///
/// # Contract
///
/// - None of these calls is assumed idempotent.
/// - `read` reports a missing attachment with `Ok(None)`; implementations may also fail with an
///   error of kind [`ErrorKind::NotFound`], which callers treat the same way.
/// - `edit_as_path_prepend` is directional: prepending on routes advertised from `from` to `to`
///   does not affect the opposite direction.
pub trait Controller {
    /// Attach a spoke gateway to a transit gateway.
    fn attach(
        &self,
        request: &AttachmentDescriptor,
    ) -> impl Future<Output = Result<(), ControllerError>> + Send;

    /// Fetch the current state of an attachment.
    fn read(
        &self,
        id: &AttachmentIdentity,
    ) -> impl Future<Output = Result<Option<ObservedAttachment>, ControllerError>> + Send;

    /// Update a single mutable attribute of an attachment.
    fn update_field(
        &self,
        id: &AttachmentIdentity,
        update: FieldUpdate,
    ) -> impl Future<Output = Result<(), ControllerError>> + Send;

    /// Detach a spoke gateway from a transit gateway.
    fn detach(
        &self,
        id: &AttachmentIdentity,
    ) -> impl Future<Output = Result<(), ControllerError>> + Send;

    /// Set the AS path prepended on routes advertised from gateway `from` to gateway `to`.
    /// An empty path clears any prepending.
    fn edit_as_path_prepend(
        &self,
        from: &str,
        to: &str,
        path: &AsPath,
    ) -> impl Future<Output = Result<(), ControllerError>> + Send;

    /// The WAN interfaces a gateway uses by default.
    fn gateway_wan_interfaces(
        &self,
        gateway: &str,
    ) -> impl Future<Output = Result<WanInterfaces, ControllerError>> + Send;
}
