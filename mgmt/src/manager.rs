// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Create, read, update and delete spoke/transit attachments through a [`Controller`].
//!
//! A [`Manager<R, C>`] is a cheap handle on a controller `C`, typed by the kind of resource `R`
//! it manages:
//!
//! - `Manager<AttachmentSpec, C>` manages whole attachments (observe, create, update, remove,
//!   reconcile, import),
//! - `Manager<AsPath, C>` sets the AS path prepended in one direction of an attachment,
//! - `Manager<FieldUpdate, C>` updates one other mutable attribute in place.
//!
//! Operations run to completion one at a time and never roll back: when a step fails, the steps
//! already applied stay applied and the error is returned. The [`AttachmentState`] passed to the
//! operation records what is known to have been applied, so that reconciling again converges.

use std::marker::PhantomData;
use std::sync::Arc;

use config::{
    AsPath, AttachmentIdentity, AttachmentSpec, Direction, MutableField, ObservedAttachment,
};
use controller::{Controller, FieldUpdate};
use rekon::{Create, Observe, Op, Reconcile, Remove, Update};
use tracing::{debug, error, info};

use crate::errors::AttachmentError;
use crate::registry::Plan;
use crate::retry::create_with_retry;

#[derive(Debug)]
pub struct Manager<R, C> {
    controller: Arc<C>,
    _marker: PhantomData<R>,
}

impl<R, C> Manager<R, C> {
    #[must_use]
    pub fn new(controller: Arc<C>) -> Self {
        Manager {
            controller,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn controller(&self) -> &C {
        &self.controller
    }
}

impl<R, C> Clone for Manager<R, C> {
    fn clone(&self) -> Self {
        Self::new(self.controller.clone())
    }
}

impl<T, U, C> From<&Manager<T, C>> for Manager<U, C> {
    fn from(manager: &Manager<T, C>) -> Self {
        Self::new(manager.controller.clone())
    }
}

/// Whether a read found the attachment.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Presence {
    Present,
    Absent,
}

/// What is known locally about one attachment.
#[derive(Clone, Debug, PartialEq)]
pub struct AttachmentState {
    /// Set from just before the attach call until the attachment is found to be gone.
    pub id: Option<AttachmentIdentity>,
    /// The declaration as last applied, refreshed from the controller by every read.
    pub spec: AttachmentSpec,
    /// The last observation.
    pub observed: Option<ObservedAttachment>,
}

impl AttachmentState {
    /// The state of a declared attachment not created yet.
    #[must_use]
    pub fn new(spec: AttachmentSpec) -> Self {
        Self {
            id: None,
            spec,
            observed: None,
        }
    }

    #[must_use]
    pub fn is_tracked(&self) -> bool {
        self.id.is_some()
    }

    /// The tracked identity if any, else the one derived from the declaration.
    #[must_use]
    pub fn identity(&self) -> AttachmentIdentity {
        self.id.clone().unwrap_or_else(|| self.spec.identity())
    }

    fn forget(&mut self) {
        self.id = None;
        self.observed = None;
    }
}

impl<C: Controller + Send + Sync> Manager<AttachmentSpec, C> {
    /// Tells if the WAN interfaces reported by the controller belong in the recorded state.
    ///
    /// They don't when the controller reports none, nor when none were declared and the
    /// controller merely reports the spoke gateway's defaults.
    async fn keeps_wan_interfaces(
        &self,
        recorded: &AttachmentSpec,
        observed: &ObservedAttachment,
    ) -> Result<bool, AttachmentError> {
        if observed.edge_wan_interfaces.is_empty() {
            return Ok(false);
        }
        if !recorded.edge_wan_interfaces.is_empty() {
            return Ok(true);
        }
        let defaults = self
            .controller
            .gateway_wan_interfaces(&observed.spoke_gw_name)
            .await
            .map_err(|e| AttachmentError::remote("read", &observed.identity(), e))?;
        Ok(observed.edge_wan_interfaces != defaults)
    }
}

impl<C: Controller + Send + Sync> Observe for Manager<AttachmentSpec, C> {
    type Subject<'a>
        = &'a mut AttachmentState
    where
        Self: 'a;
    type Observation<'a>
        = Result<Presence, AttachmentError>
    where
        Self: 'a;

    #[tracing::instrument(level = "debug", skip_all, fields(id = ?state.id))]
    async fn observe<'a>(&self, state: &'a mut AttachmentState) -> Self::Observation<'a>
    where
        Self: 'a,
    {
        let Some(id) = state.id.clone() else {
            debug!("Attachment {} is not tracked", state.spec.identity());
            return Ok(Presence::Absent);
        };
        let observed = match self.controller.read(&id).await {
            Ok(observed) => observed,
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(AttachmentError::remote("read", &id, err)),
        };
        let Some(observed) = observed else {
            info!("Attachment {id} no longer exists");
            state.forget();
            return Ok(Presence::Absent);
        };
        let with_wan_interfaces = self.keeps_wan_interfaces(&state.spec, &observed).await?;
        observed.refresh(&mut state.spec, with_wan_interfaces);
        state.observed = Some(observed);
        Ok(Presence::Present)
    }
}

impl<C: Controller + Send + Sync> Create for Manager<AttachmentSpec, C> {
    type Requirement<'a>
        = &'a mut AttachmentState
    where
        Self: 'a;
    type Outcome<'a>
        = Result<(), AttachmentError>
    where
        Self: 'a;

    /// Attach, then set the prepend paths, then read back.
    ///
    /// Only the attach call is retried. The tracked identity is cleared if it fails, and kept if
    /// a later step fails.
    #[tracing::instrument(level = "info", skip_all, fields(id = %state.spec.identity()))]
    async fn create<'a>(&self, state: &'a mut AttachmentState) -> Self::Outcome<'a>
    where
        Self: 'a,
    {
        let descriptor = state.spec.build_descriptor()?;
        let id = descriptor.identity();
        state.id = Some(id.clone());

        // prepend paths are recorded as they get applied
        let paths = Direction::ALL.map(|d| (d, std::mem::take(state.spec.prepend_path_mut(d))));

        let policy = state.spec.retry_policy();
        match create_with_retry(policy, |_| self.controller.attach(&descriptor)).await {
            Ok(attempts) => info!("Attached {id} ({attempts} attempts)"),
            Err(failure) => {
                error!("Failed to attach {id}: {}", failure.error);
                state.id = None;
                for (direction, path) in paths {
                    *state.spec.prepend_path_mut(direction) = path;
                }
                return Err(if failure.exhausted() {
                    AttachmentError::RetriesExhausted {
                        id,
                        attempts: failure.attempts,
                        source: failure.error,
                    }
                } else {
                    AttachmentError::remote("attach", &id, failure.error)
                });
            }
        }

        let prepends = Manager::<AsPath, C>::from(self);
        for (direction, path) in paths {
            if path.is_empty() {
                continue;
            }
            prepends.update((direction, &path), &id).await?;
            *state.spec.prepend_path_mut(direction) = path;
        }

        self.observe(state).await?;
        Ok(())
    }
}

impl<C: Controller + Send + Sync> Update for Manager<AttachmentSpec, C> {
    type Requirement<'a>
        = &'a AttachmentSpec
    where
        Self: 'a;
    type Observation<'a>
        = &'a mut AttachmentState
    where
        Self: 'a;
    type Outcome<'a>
        = Result<(), AttachmentError>
    where
        Self: 'a;

    /// Apply the changed mutable fields, one controller call each, then read back.
    ///
    /// Changes to immutable fields are refused before any controller call.
    #[tracing::instrument(level = "info", skip_all, fields(id = %state.identity()))]
    async fn update<'a>(
        &self,
        spec: &'a AttachmentSpec,
        state: &'a mut AttachmentState,
    ) -> Self::Outcome<'a>
    where
        Self: 'a,
    {
        let descriptor = spec.build_descriptor()?;
        let Some(id) = state.id.clone() else {
            return Err(AttachmentError::NotFound(state.identity()));
        };
        let fields = state.spec.immutable_changes(spec);
        if !fields.is_empty() {
            return Err(AttachmentError::RecreateRequired { id, fields });
        }

        let changes = state.spec.mutable_changes(spec);
        if changes.is_empty() {
            debug!("No mutable field changed for {id}");
        }
        let prepends = Manager::<AsPath, C>::from(self);
        let updates = Manager::<FieldUpdate, C>::from(self);
        for field in changes {
            match field {
                MutableField::SpokePrependAsPath | MutableField::TransitPrependAsPath => {
                    let direction = if field == MutableField::SpokePrependAsPath {
                        Direction::SpokeToTransit
                    } else {
                        Direction::TransitToSpoke
                    };
                    let path = spec.prepend_path(direction);
                    prepends.update((direction, path), &id).await?;
                    state.spec.prepend_path_mut(direction).clone_from(path);
                }
                MutableField::InsaneModeTunnelNumber => {
                    // only reported when insane mode is on, in which case the descriptor has it
                    let Some(count) = descriptor.insane_mode_tunnel_number else {
                        continue;
                    };
                    updates
                        .update(FieldUpdate::InsaneModeTunnelNumber(count), &id)
                        .await?;
                    state.spec.insane_mode_tunnel_number = spec.insane_mode_tunnel_number;
                }
            }
        }
        state.spec.number_of_retries = spec.number_of_retries;
        state.spec.retry_interval = spec.retry_interval;

        self.observe(state).await?;
        Ok(())
    }
}

impl<C: Controller + Send + Sync> Remove for Manager<AttachmentSpec, C> {
    type Observation<'a>
        = &'a mut AttachmentState
    where
        Self: 'a;
    type Outcome<'a>
        = Result<(), AttachmentError>
    where
        Self: 'a;

    /// Detach. An attachment the controller does not know is considered removed.
    #[tracing::instrument(level = "info", skip_all, fields(id = %state.identity()))]
    async fn remove<'a>(&self, state: &'a mut AttachmentState) -> Self::Outcome<'a>
    where
        Self: 'a,
    {
        let id = state.identity();
        match self.controller.detach(&id).await {
            Ok(()) => info!("Detached {id}"),
            Err(err) if err.is_not_found() => info!("Attachment {id} was already gone"),
            Err(err) => return Err(AttachmentError::remote("detach", &id, err)),
        }
        state.forget();
        Ok(())
    }
}

impl<C: Controller + Send + Sync> Reconcile for Manager<AttachmentSpec, C> {
    /// The declaration, or `None` if the attachment should not exist.
    type Requirement<'a>
        = Option<&'a AttachmentSpec>
    where
        Self: 'a;
    type Observation<'a>
        = &'a mut AttachmentState
    where
        Self: 'a;
    type Outcome<'a>
        = Option<Op<'a, Self>>
    where
        Self: 'a;

    async fn reconcile<'a>(
        &self,
        requirement: Option<&'a AttachmentSpec>,
        state: &'a mut AttachmentState,
    ) -> Self::Outcome<'a>
    where
        Self: 'a,
    {
        match requirement {
            None if state.is_tracked() => Some(Op::Remove(self.remove(state).await)),
            None => None,
            Some(spec) if !state.is_tracked() => {
                state.spec = spec.clone();
                Some(Op::Create(self.create(state).await))
            }
            Some(spec) => match Plan::new(Some(&*state), spec) {
                Plan::InSync => None,
                Plan::Create | Plan::Update(_) | Plan::Recreate(_) => {
                    Some(Op::Update(self.update(spec, state).await))
                }
            },
        }
    }
}

impl<C: Controller + Send + Sync> Update for Manager<AsPath, C> {
    type Requirement<'a>
        = (Direction, &'a AsPath)
    where
        Self: 'a;
    type Observation<'a>
        = &'a AttachmentIdentity
    where
        Self: 'a;
    type Outcome<'a>
        = Result<(), AttachmentError>
    where
        Self: 'a;

    /// Set the prepend path of one direction. An empty path clears it.
    async fn update<'a>(
        &self,
        requirement: (Direction, &'a AsPath),
        id: &'a AttachmentIdentity,
    ) -> Self::Outcome<'a>
    where
        Self: 'a,
    {
        let (direction, path) = requirement;
        let (from, to) = id.endpoints(direction);
        debug!("Setting AS path prepend {direction} ({from} -> {to}) to '{path}'");
        self.controller
            .edit_as_path_prepend(from, to, path)
            .await
            .map_err(|e| AttachmentError::remote("set AS path prepend on", id, e))
    }
}

impl<C: Controller + Send + Sync> Update for Manager<FieldUpdate, C> {
    type Requirement<'a>
        = FieldUpdate
    where
        Self: 'a;
    type Observation<'a>
        = &'a AttachmentIdentity
    where
        Self: 'a;
    type Outcome<'a>
        = Result<(), AttachmentError>
    where
        Self: 'a;

    async fn update<'a>(&self, update: FieldUpdate, id: &'a AttachmentIdentity) -> Self::Outcome<'a>
    where
        Self: 'a,
    {
        debug!("Updating {id}: {update}");
        self.controller
            .update_field(id, update)
            .await
            .map_err(|e| AttachmentError::remote("update", id, e))
    }
}
