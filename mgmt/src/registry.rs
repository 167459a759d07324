// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Table of the attachments under management, keyed by identity.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use config::{AttachmentIdentity, AttachmentSpec, ImmutableField, MutableField, stringify};
use controller::Controller;
use rekon::{Observe, Op, Reconcile};
use tracing::{debug, error, info};

use crate::errors::AttachmentError;
use crate::manager::{AttachmentState, Manager};

/// What it takes to bring an attachment to its declared state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Plan {
    Create,
    /// Update these fields in place.
    Update(Vec<MutableField>),
    /// These fields cannot change in place: the attachment must be detached and attached again.
    Recreate(Vec<ImmutableField>),
    InSync,
}

impl Plan {
    /// Compare a declaration with the state of the attachment, if known.
    #[must_use]
    pub fn new(state: Option<&AttachmentState>, declared: &AttachmentSpec) -> Self {
        let Some(state) = state.filter(|s| s.is_tracked()) else {
            return Plan::Create;
        };
        let immutable = state.spec.immutable_changes(declared);
        if !immutable.is_empty() {
            return Plan::Recreate(immutable);
        }
        let mutable = state.spec.mutable_changes(declared);
        if mutable.is_empty() {
            Plan::InSync
        } else {
            Plan::Update(mutable)
        }
    }
}

/// The attachments under management.
///
/// Entries are keyed by the identity derived from their declaration. An entry exists from the
/// first successful create (or import) of an attachment until it is withdrawn.
#[derive(Clone, Debug, Default)]
pub struct AttachmentTable(BTreeMap<AttachmentIdentity, AttachmentState>);

impl AttachmentTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Put an attachment under management, e.g. after an import.
    /// Returns the state previously held for the same identity, if any.
    pub fn add(&mut self, state: AttachmentState) -> Option<AttachmentState> {
        self.0.insert(state.identity(), state)
    }

    #[must_use]
    pub fn get(&self, id: &AttachmentIdentity) -> Option<&AttachmentState> {
        self.0.get(id)
    }

    pub fn values(&self) -> impl Iterator<Item = &AttachmentState> {
        self.0.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// What [`AttachmentTable::apply`] would do with a declaration.
    #[must_use]
    pub fn plan(&self, declared: &AttachmentSpec) -> Plan {
        Plan::new(self.0.get(&declared.identity()), declared)
    }

    /// Bring the attachment a declaration describes to its declared state, and return the plan
    /// that was carried out.
    ///
    /// A managed attachment is read first, so that the plan is made against what the controller
    /// reports. A [`Plan::Recreate`] is not carried out: it fails with
    /// [`AttachmentError::RecreateRequired`], see [`AttachmentTable::replace`].
    pub async fn apply<C: Controller + Send + Sync>(
        &mut self,
        manager: &Manager<AttachmentSpec, C>,
        declared: &AttachmentSpec,
    ) -> Result<Plan, AttachmentError> {
        let id = declared.identity();
        debug!("Validation of {id}: {}", stringify(&declared.validate()));
        if let Some(state) = self.0.get_mut(&id) {
            manager.observe(state).await?;
            if !state.is_tracked() {
                info!("Attachment {id} disappeared, it will be created again");
                self.0.remove(&id);
            }
        }
        let plan = self.plan(declared);
        let state = match self.0.entry(id.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(AttachmentState::new(declared.clone())),
        };
        let result = match manager.reconcile(Some(declared), state).await {
            None => Ok(()),
            Some(Op::Create(result) | Op::Update(result) | Op::Remove(result)) => result,
        };
        if !state.is_tracked() {
            // failed create: nothing exists remotely
            self.0.remove(&id);
        }
        match result {
            Ok(()) => {
                info!("Applied {plan:?} to {id}");
                Ok(plan)
            }
            Err(err) => {
                error!("Failed to apply {plan:?} to {id}: {err}");
                Err(err)
            }
        }
    }

    /// Detach an attachment and stop managing it.
    ///
    /// Returns `false` if the attachment was not under management.
    pub async fn withdraw<C: Controller + Send + Sync>(
        &mut self,
        manager: &Manager<AttachmentSpec, C>,
        id: &AttachmentIdentity,
    ) -> Result<bool, AttachmentError> {
        let Some(state) = self.0.get_mut(id) else {
            debug!("Attachment {id} is not managed");
            return Ok(false);
        };
        if let Some(Op::Create(Err(err)) | Op::Update(Err(err)) | Op::Remove(Err(err))) =
            manager.reconcile(None, state).await
        {
            return Err(err);
        }
        self.0.remove(id);
        Ok(true)
    }

    /// Detach the attachment known as `previous` and attach the one `declared` describes.
    ///
    /// This is how changes to immutable fields, gateway names included, are carried out.
    pub async fn replace<C: Controller + Send + Sync>(
        &mut self,
        manager: &Manager<AttachmentSpec, C>,
        previous: &AttachmentIdentity,
        declared: &AttachmentSpec,
    ) -> Result<Plan, AttachmentError> {
        declared.validate()?;
        info!("Replacing {previous} with {}", declared.identity());
        self.withdraw(manager, previous).await?;
        self.apply(manager, declared).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::AsPath;
    use controller::ControllerError;
    use controller::fake::{CallKind, FakeController};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tracing_test::traced_test;

    fn setup() -> (Arc<FakeController>, Manager<AttachmentSpec, FakeController>) {
        let fake = Arc::new(
            FakeController::new()
                .with_gateway("spoke-a", ["eth1"])
                .with_gateway("transit-b", ["eth1"])
                .with_gateway("transit-c", ["eth1"]),
        );
        let manager = Manager::new(fake.clone());
        (fake, manager)
    }

    #[test]
    fn plans() {
        let spec = AttachmentSpec::new("spoke-a", "transit-b");
        assert_eq!(Plan::new(None, &spec), Plan::Create);

        let mut state = AttachmentState::new(spec.clone());
        assert_eq!(Plan::new(Some(&state), &spec), Plan::Create);

        state.id = Some(spec.identity());
        assert_eq!(Plan::new(Some(&state), &spec), Plan::InSync);

        let mut changed = spec.clone();
        changed.spoke_prepend_as_path = AsPath::parse(["65001"]).unwrap();
        assert_eq!(
            Plan::new(Some(&state), &changed),
            Plan::Update(vec![MutableField::SpokePrependAsPath])
        );

        changed.spoke_gw_name = "spoke-z".to_string();
        changed.enable_max_performance = false;
        assert_eq!(
            Plan::new(Some(&state), &changed),
            Plan::Recreate(vec![
                ImmutableField::SpokeGwName,
                ImmutableField::EnableMaxPerformance
            ])
        );
    }

    #[traced_test]
    #[tokio::test]
    async fn apply_converges() {
        let (fake, manager) = setup();
        let mut table = AttachmentTable::new();
        let mut spec = AttachmentSpec::new("spoke-a", "transit-b");

        assert_eq!(table.apply(&manager, &spec).await, Ok(Plan::Create));
        assert_eq!(table.len(), 1);
        assert_eq!(table.apply(&manager, &spec).await, Ok(Plan::InSync));

        spec.transit_prepend_as_path = AsPath::parse(["65002"]).unwrap();
        assert_eq!(
            table.plan(&spec),
            Plan::Update(vec![MutableField::TransitPrependAsPath])
        );
        assert!(table.apply(&manager, &spec).await.is_ok());
        assert_eq!(table.plan(&spec), Plan::InSync);
        assert_eq!(fake.count(CallKind::Attach), 1);
        assert!(logs_contain("Applied InSync to spoke-a~transit-b"));
    }

    #[tokio::test]
    async fn failed_create_is_not_tracked() {
        let (fake, manager) = setup();
        let mut table = AttachmentTable::new();
        fake.fail_next(CallKind::Attach, [ControllerError::fatal("quota exceeded")]);
        let spec = AttachmentSpec::new("spoke-a", "transit-b");
        assert!(table.apply(&manager, &spec).await.is_err());
        assert!(table.is_empty());
        assert_eq!(table.apply(&manager, &spec).await, Ok(Plan::Create));
    }

    #[tokio::test]
    async fn immutable_change_needs_a_replace() {
        let (fake, manager) = setup();
        let mut table = AttachmentTable::new();
        let spec = AttachmentSpec::new("spoke-a", "transit-b");
        table.apply(&manager, &spec).await.unwrap();

        let mut jumbo = spec.clone();
        jumbo.enable_jumbo_frame = true;
        assert_eq!(
            table.apply(&manager, &jumbo).await,
            Err(AttachmentError::RecreateRequired {
                id: spec.identity(),
                fields: vec![ImmutableField::EnableJumboFrame]
            })
        );
        assert_eq!(fake.count(CallKind::Detach), 0);

        assert_eq!(
            table.replace(&manager, &spec.identity(), &jumbo).await,
            Ok(Plan::Create)
        );
        assert!(fake.get(&spec.identity()).unwrap().enable_jumbo_frame);
        assert_eq!(fake.count(CallKind::Detach), 1);
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn rename_is_a_replace() {
        let (fake, manager) = setup();
        let mut table = AttachmentTable::new();
        let old = AttachmentSpec::new("spoke-a", "transit-b");
        table.apply(&manager, &old).await.unwrap();

        let new = AttachmentSpec::new("spoke-a", "transit-c");
        table
            .replace(&manager, &old.identity(), &new)
            .await
            .unwrap();
        assert!(table.get(&old.identity()).is_none());
        assert!(table.get(&new.identity()).is_some());
        assert!(fake.get(&old.identity()).is_none());
        assert!(fake.get(&new.identity()).is_some());
    }

    #[tokio::test]
    async fn replace_validates_first() {
        let (fake, manager) = setup();
        let mut table = AttachmentTable::new();
        let old = AttachmentSpec::new("spoke-a", "transit-b");
        table.apply(&manager, &old).await.unwrap();
        let bad = AttachmentSpec::new("spoke-a", "");
        assert!(matches!(
            table.replace(&manager, &old.identity(), &bad).await,
            Err(AttachmentError::Validation(_))
        ));
        assert_eq!(fake.count(CallKind::Detach), 0);
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn withdraw() {
        let (fake, manager) = setup();
        let mut table = AttachmentTable::new();
        let spec = AttachmentSpec::new("spoke-a", "transit-b");
        assert_eq!(table.withdraw(&manager, &spec.identity()).await, Ok(false));
        table.apply(&manager, &spec).await.unwrap();

        fake.fail_next(CallKind::Detach, [ControllerError::fatal("locked")]);
        assert!(table.withdraw(&manager, &spec.identity()).await.is_err());
        assert_eq!(table.len(), 1);

        assert_eq!(table.withdraw(&manager, &spec.identity()).await, Ok(true));
        assert!(table.is_empty());
    }

    #[test]
    fn generated_declarations_converge() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();
        bolero::check!()
            .with_type()
            .for_each(|spec: &AttachmentSpec| {
                runtime.block_on(async {
                    let fake = Arc::new(
                        FakeController::new()
                            .with_gateway(&spec.spoke_gw_name, ["eth1", "eth2"])
                            .with_gateway(&spec.transit_gw_name, Vec::<String>::new()),
                    );
                    let manager = Manager::new(fake.clone());
                    let mut table = AttachmentTable::new();
                    assert_eq!(table.apply(&manager, spec).await, Ok(Plan::Create));
                    assert_eq!(table.plan(spec), Plan::InSync);
                    assert_eq!(fake.count(CallKind::Attach), 1);
                });
            });
    }
}
