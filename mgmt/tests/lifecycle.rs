// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use gwattach_mgmt as mgmt;

use std::sync::Arc;
use std::time::Duration;

use config::{AsPath, AttachmentIdentity, AttachmentSpec, ConfigError};
use controller::fake::{Call, CallKind, FakeController};
use controller::{ControllerError, FieldUpdate};
use mgmt::{AttachmentError, AttachmentState, AttachmentTable, Manager, Plan, Presence};
use pretty_assertions::assert_eq;
use rekon::{Create, Import, Observe, Remove, Update};
use tokio::time::Instant;
use tracectl::{LevelFilter, get_trace_ctl};

fn controller() -> Arc<FakeController> {
    Arc::new(
        FakeController::new()
            .with_gateway("spoke-a", ["eth1", "eth2"])
            .with_gateway("transit-b", ["eth1"]),
    )
}

fn declared() -> AttachmentSpec {
    AttachmentSpec::from_yaml(
        r#"
spoke_gw_name: spoke-a
transit_gw_name: transit-b
enable_insane_mode: true
insane_mode_tunnel_number: 4
spoke_prepend_as_path: ["65001", "65001"]
number_of_retries: 2
retry_interval: 60
"#,
    )
    .unwrap()
}

#[test]
fn scenario_validation() {
    assert_eq!(
        AttachmentIdentity::new("spoke-a", "transit-b").to_string(),
        "spoke-a~transit-b"
    );
    let mut spec = AttachmentSpec::new("spoke-a", "transit-b");
    spec.enable_insane_mode = true;
    spec.insane_mode_tunnel_number = 50;
    assert!(matches!(
        spec.build_descriptor(),
        Err(ConfigError::TunnelCountOutOfRange { .. })
    ));
    spec.enable_insane_mode = false;
    spec.insane_mode_tunnel_number = 999;
    assert!(spec.build_descriptor().is_ok());
}

#[tokio::test(start_paused = true)]
async fn full_lifecycle() {
    let fake = controller();
    let manager = Manager::new(fake.clone());
    let id = AttachmentIdentity::new("spoke-a", "transit-b");

    // the spoke gateway is still being provisioned for the first attempt
    fake.fail_next(
        CallKind::Attach,
        [ControllerError::from_message("Gateway spoke-a is not ready")],
    );
    let mut state = AttachmentState::new(declared());
    let start = Instant::now();
    manager.create(&mut state).await.unwrap();
    assert_eq!(start.elapsed(), Duration::from_secs(60));
    assert_eq!(state.id, Some(id.clone()));
    assert_eq!(state.spec, declared());

    // change the tunnel count only
    fake.clear_calls();
    let mut spec = declared();
    spec.insane_mode_tunnel_number = 10;
    manager.update(&spec, &mut state).await.unwrap();
    let updates = fake
        .calls()
        .into_iter()
        .filter(|c| matches!(c.kind(), CallKind::UpdateField | CallKind::EditAsPathPrepend))
        .collect::<Vec<_>>();
    assert_eq!(
        updates,
        vec![Call::UpdateField(
            id.clone(),
            FieldUpdate::InsaneModeTunnelNumber(10)
        )]
    );

    // updates are never retried
    spec.spoke_prepend_as_path = AsPath::empty();
    fake.fail_next(
        CallKind::EditAsPathPrepend,
        [ControllerError::transient("try again")],
    );
    assert!(manager.update(&spec, &mut state).await.is_err());
    assert_eq!(fake.count(CallKind::EditAsPathPrepend), 1);
    manager.update(&spec, &mut state).await.unwrap();
    assert_eq!(state.spec, spec);

    // a fresh import sees the same thing
    let imported = manager.import(&id.to_string()).await.unwrap();
    assert_eq!(imported.observed, state.observed);
    assert_eq!(imported.spec.spoke_prepend_as_path, spec.spoke_prepend_as_path);
    assert_eq!(
        imported.spec.insane_mode_tunnel_number,
        spec.insane_mode_tunnel_number
    );

    // delete, twice
    manager.remove(&mut state).await.unwrap();
    let mut stale = imported;
    manager.remove(&mut stale).await.unwrap();
    assert_eq!(fake.count(CallKind::Detach), 2);
    assert_eq!(manager.observe(&mut stale).await, Ok(Presence::Absent));
    assert!(matches!(
        manager.import("spoke-a~transit-b").await,
        Err(AttachmentError::NotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn table_lifecycle() {
    let fake = controller();
    let manager = Manager::new(fake.clone());
    let mut table = AttachmentTable::new();

    let mut spec = declared();
    assert_eq!(table.apply(&manager, &spec).await, Ok(Plan::Create));
    spec.transit_prepend_as_path = AsPath::parse(["65002"]).unwrap();
    assert!(table.apply(&manager, &spec).await.is_ok());
    assert_eq!(table.plan(&spec), Plan::InSync);

    // the attachment is removed behind our back
    fake.forget(&spec.identity());
    assert_eq!(table.apply(&manager, &spec).await, Ok(Plan::Create));
    assert_eq!(table.len(), 1);
    assert_eq!(fake.count(CallKind::Attach), 2);

    // take over an attachment created elsewhere
    let mut table = AttachmentTable::new();
    let imported = manager.import("spoke-a~transit-b").await.unwrap();
    assert!(table.add(imported).is_none());
    assert_eq!(table.plan(&spec), Plan::InSync);
    assert_eq!(table.withdraw(&manager, &spec.identity()).await, Ok(true));
}

#[test]
fn tracing_targets_are_registered() {
    let tctl = get_trace_ctl();
    for (tag, target) in [
        ("mgmt", "gwattach_mgmt"),
        ("config", "gwattach_config"),
        ("controller", "gwattach_controller"),
    ] {
        let targets = tctl.targets_by_tag(tag);
        assert!(targets.iter().any(|t| t.target == target), "{tag}");
    }
    tctl.setup_from_string("attach-mgmt=debug").unwrap();
    assert_eq!(
        tctl.target("gwattach_mgmt").map(|t| t.level),
        Some(LevelFilter::DEBUG)
    );
}
