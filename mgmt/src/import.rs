// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Take an existing attachment under management from its identity string.

use config::{AttachmentIdentity, AttachmentSpec};
use controller::Controller;
use rekon::{Import, Observe};
use tracing::info;

use crate::errors::AttachmentError;
use crate::manager::{AttachmentState, Manager, Presence};

impl<C: Controller + Send + Sync> Import for Manager<AttachmentSpec, C> {
    /// `<spoke_gw_name>~<transit_gw_name>`
    type Key<'a>
        = &'a str
    where
        Self: 'a;
    type Outcome<'a>
        = Result<AttachmentState, AttachmentError>
    where
        Self: 'a;

    /// Read the attachment an identity string names. The returned state records what the
    /// controller reports, so that a later update only applies actual differences.
    #[tracing::instrument(level = "info", skip(self))]
    async fn import<'a>(&self, key: &'a str) -> Self::Outcome<'a>
    where
        Self: 'a,
    {
        let id: AttachmentIdentity = key.parse()?;
        let mut state = AttachmentState::new(AttachmentSpec::new(id.spoke(), id.transit()));
        state.id = Some(id.clone());
        match self.observe(&mut state).await? {
            Presence::Present => {
                info!("Imported attachment {id}");
                Ok(state)
            }
            Presence::Absent => Err(AttachmentError::NotFound(id)),
        }
    }
}
