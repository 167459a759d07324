// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! In-memory controller for tests.
//!
//! [`FakeController`] keeps attachments in a map, records every call it receives, and can be
//! scripted to fail the next call(s) of a given kind.

use std::collections::{BTreeMap, VecDeque};

use config::{AsPath, AttachmentDescriptor, AttachmentIdentity, ObservedAttachment, WanInterfaces};
use parking_lot::Mutex;
use tracing::debug;

use crate::{Controller, ControllerError, FieldUpdate};

/// The kinds of calls a [`FakeController`] can receive.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum CallKind {
    Attach,
    Read,
    UpdateField,
    Detach,
    EditAsPathPrepend,
    GatewayWanInterfaces,
}

/// A call received by a [`FakeController`], with its arguments.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Call {
    Attach(AttachmentDescriptor),
    Read(AttachmentIdentity),
    UpdateField(AttachmentIdentity, FieldUpdate),
    Detach(AttachmentIdentity),
    EditAsPathPrepend {
        from: String,
        to: String,
        path: AsPath,
    },
    GatewayWanInterfaces(String),
}

impl Call {
    #[must_use]
    pub fn kind(&self) -> CallKind {
        match self {
            Call::Attach(_) => CallKind::Attach,
            Call::Read(_) => CallKind::Read,
            Call::UpdateField(..) => CallKind::UpdateField,
            Call::Detach(_) => CallKind::Detach,
            Call::EditAsPathPrepend { .. } => CallKind::EditAsPathPrepend,
            Call::GatewayWanInterfaces(_) => CallKind::GatewayWanInterfaces,
        }
    }
}

#[derive(Debug, Default)]
struct FakeState {
    gateways: BTreeMap<String, WanInterfaces>,
    attachments: BTreeMap<AttachmentIdentity, ObservedAttachment>,
    scripted: BTreeMap<CallKind, VecDeque<ControllerError>>,
    sticky: BTreeMap<CallKind, ControllerError>,
    calls: Vec<Call>,
}

impl FakeState {
    /// Record the call and return the failure scripted for it, if any.
    fn enter(&mut self, call: Call) -> Result<(), ControllerError> {
        let kind = call.kind();
        debug!("fake controller: {call:?}");
        self.calls.push(call);
        if let Some(err) = self.scripted.get_mut(&kind).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        if let Some(err) = self.sticky.get(&kind) {
            return Err(err.clone());
        }
        Ok(())
    }

    fn attachment_mut(
        &mut self,
        id: &AttachmentIdentity,
    ) -> Result<&mut ObservedAttachment, ControllerError> {
        self.attachments
            .get_mut(id)
            .ok_or_else(|| ControllerError::not_found(format!("attachment {id} does not exist")))
    }
}

/// A [`Controller`] backed by memory.
///
/// Gateways must be registered with [`FakeController::with_gateway`] before they can be
/// attached.
#[derive(Debug, Default)]
pub struct FakeController {
    state: Mutex<FakeState>,
}

impl FakeController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a gateway and its default WAN interfaces.
    #[must_use]
    pub fn with_gateway<I, S>(self, name: &str, wan_interfaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.lock().gateways.insert(
            name.to_owned(),
            wan_interfaces.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Make the next calls of the given kind fail, in order, with the given errors.
    pub fn fail_next(&self, kind: CallKind, errors: impl IntoIterator<Item = ControllerError>) {
        self.state
            .lock()
            .scripted
            .entry(kind)
            .or_default()
            .extend(errors);
    }

    /// Make every call of the given kind fail (after any scripted failures are consumed).
    pub fn fail_always(&self, kind: CallKind, error: ControllerError) {
        self.state.lock().sticky.insert(kind, error);
    }

    /// Stop failing calls of the given kind.
    pub fn heal(&self, kind: CallKind) {
        let mut state = self.state.lock();
        state.sticky.remove(&kind);
        state.scripted.remove(&kind);
    }

    /// Put an attachment in place without going through [`Controller::attach`].
    pub fn insert(&self, observed: ObservedAttachment) {
        self.state
            .lock()
            .attachments
            .insert(observed.identity(), observed);
    }

    /// Remove an attachment behind the reconciler's back.
    pub fn forget(&self, id: &AttachmentIdentity) -> Option<ObservedAttachment> {
        self.state.lock().attachments.remove(id)
    }

    #[must_use]
    pub fn get(&self, id: &AttachmentIdentity) -> Option<ObservedAttachment> {
        self.state.lock().attachments.get(id).cloned()
    }

    /// All calls received so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    /// The number of calls of the given kind received so far.
    #[must_use]
    pub fn count(&self, kind: CallKind) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.kind() == kind)
            .count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }
}

impl Controller for FakeController {
    async fn attach(&self, request: &AttachmentDescriptor) -> Result<(), ControllerError> {
        let mut state = self.state.lock();
        state.enter(Call::Attach(request.clone()))?;
        let id = request.identity();
        if state.attachments.contains_key(&id) {
            return Err(ControllerError::fatal(format!(
                "{} is already attached to {}",
                id.spoke(),
                id.transit()
            )));
        }
        let Some(spoke_wan) = state.gateways.get(id.spoke()).cloned() else {
            return Err(ControllerError::fatal(format!(
                "unknown gateway {}",
                id.spoke()
            )));
        };
        if !state.gateways.contains_key(id.transit()) {
            return Err(ControllerError::fatal(format!(
                "unknown gateway {}",
                id.transit()
            )));
        }
        let requested: WanInterfaces = request.wan_interfaces().map(str::to_owned).collect();
        let observed = ObservedAttachment {
            spoke_gw_name: request.spoke_gw_name.clone(),
            transit_gw_name: request.transit_gw_name.clone(),
            enable_over_private_network: request.enable_over_private_network,
            enable_jumbo_frame: request.enable_jumbo_frame,
            enable_insane_mode: request.enable_insane_mode,
            insane_mode_tunnel_number: request.insane_mode_tunnel_number.unwrap_or_default(),
            enable_max_performance: request.enable_max_performance,
            spoke_prepend_as_path: AsPath::empty(),
            transit_prepend_as_path: AsPath::empty(),
            edge_wan_interfaces: if requested.is_empty() {
                spoke_wan
            } else {
                requested
            },
        };
        state.attachments.insert(id, observed);
        Ok(())
    }

    async fn read(
        &self,
        id: &AttachmentIdentity,
    ) -> Result<Option<ObservedAttachment>, ControllerError> {
        let mut state = self.state.lock();
        state.enter(Call::Read(id.clone()))?;
        Ok(state.attachments.get(id).cloned())
    }

    async fn update_field(
        &self,
        id: &AttachmentIdentity,
        update: FieldUpdate,
    ) -> Result<(), ControllerError> {
        let mut state = self.state.lock();
        state.enter(Call::UpdateField(id.clone(), update))?;
        let attachment = state.attachment_mut(id)?;
        match update {
            FieldUpdate::InsaneModeTunnelNumber(count) => {
                attachment.insane_mode_tunnel_number = count;
            }
        }
        Ok(())
    }

    async fn detach(&self, id: &AttachmentIdentity) -> Result<(), ControllerError> {
        let mut state = self.state.lock();
        state.enter(Call::Detach(id.clone()))?;
        state.attachment_mut(id)?;
        state.attachments.remove(id);
        Ok(())
    }

    async fn edit_as_path_prepend(
        &self,
        from: &str,
        to: &str,
        path: &AsPath,
    ) -> Result<(), ControllerError> {
        let mut state = self.state.lock();
        state.enter(Call::EditAsPathPrepend {
            from: from.to_owned(),
            to: to.to_owned(),
            path: path.clone(),
        })?;
        let spoke_to_transit = AttachmentIdentity::new(from, to);
        if let Ok(attachment) = state.attachment_mut(&spoke_to_transit) {
            attachment.spoke_prepend_as_path = path.clone();
            return Ok(());
        }
        let transit_to_spoke = AttachmentIdentity::new(to, from);
        let attachment = state.attachment_mut(&transit_to_spoke)?;
        attachment.transit_prepend_as_path = path.clone();
        Ok(())
    }

    async fn gateway_wan_interfaces(&self, gateway: &str) -> Result<WanInterfaces, ControllerError> {
        let mut state = self.state.lock();
        state.enter(Call::GatewayWanInterfaces(gateway.to_owned()))?;
        state
            .gateways
            .get(gateway)
            .cloned()
            .ok_or_else(|| ControllerError::not_found(format!("gateway {gateway} not found")))
    }
}
