// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Declared (desired) state of a spoke/transit attachment

use std::collections::BTreeSet;
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::debug;

use crate::aspath::AsPath;
use crate::errors::ConfigError;
use crate::identity::AttachmentIdentity;

/// The set of WAN interfaces of the spoke edge gateway that take part in the attachment.
///
/// Empty means "let the controller decide".
pub type WanInterfaces = BTreeSet<String>;

/// Bounded retry policy applied to the initial attach call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt. Zero means exactly one attempt.
    pub retries: u32,
    /// Fixed wait between two attempts.
    pub interval: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

    #[must_use]
    pub fn new(retries: u32, interval: Duration) -> Self {
        Self { retries, interval }
    }
    /// Tells if a failed attempt with the given zero-based index may be followed by another one.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_INTERVAL)
    }
}

/// Fields of an attachment that cannot be changed in place.
/// Changing any of them requires to detach and attach again.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[strum(serialize_all = "snake_case")]
pub enum ImmutableField {
    SpokeGwName,
    TransitGwName,
    EnableOverPrivateNetwork,
    EnableJumboFrame,
    EnableInsaneMode,
    EnableMaxPerformance,
    EdgeWanInterfaces,
}

/// Fields of an attachment that can be updated in place, one remote call each.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[strum(serialize_all = "snake_case")]
pub enum MutableField {
    SpokePrependAsPath,
    TransitPrependAsPath,
    InsaneModeTunnelNumber,
}

/// One direction of an attachment, for AS-path prepending.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Direction {
    #[strum(serialize = "spoke to transit")]
    SpokeToTransit,
    #[strum(serialize = "transit to spoke")]
    TransitToSpoke,
}

impl Direction {
    /// Both directions, in the order prepend paths are applied.
    pub const ALL: [Direction; 2] = [Direction::SpokeToTransit, Direction::TransitToSpoke];

    /// The field holding the prepend path for this direction.
    #[must_use]
    pub fn field(self) -> MutableField {
        match self {
            Direction::SpokeToTransit => MutableField::SpokePrependAsPath,
            Direction::TransitToSpoke => MutableField::TransitPrependAsPath,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_retry_interval() -> u64 {
    RetryPolicy::DEFAULT_INTERVAL.as_secs()
}

/// The desired state of one spoke/transit attachment, as declared by the user.
///
/// Loaded from YAML with [`AttachmentSpec::from_yaml`] or built with [`AttachmentSpecBuilder`].
#[derive(Builder, Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[builder(setter(into))]
#[serde(deny_unknown_fields)]
pub struct AttachmentSpec {
    /// Name of the spoke edge gateway.
    pub spoke_gw_name: String,
    /// Name of the transit hub gateway.
    pub transit_gw_name: String,
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub enable_over_private_network: bool,
    #[builder(default)]
    #[serde(default)]
    pub enable_jumbo_frame: bool,
    #[builder(default)]
    #[serde(default)]
    pub enable_insane_mode: bool,
    /// Only meaningful when insane mode is enabled.
    #[builder(default)]
    #[serde(default)]
    pub insane_mode_tunnel_number: i64,
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub enable_max_performance: bool,
    #[builder(default)]
    #[serde(default)]
    pub spoke_prepend_as_path: AsPath,
    #[builder(default)]
    #[serde(default)]
    pub transit_prepend_as_path: AsPath,
    #[builder(default)]
    #[serde(default)]
    pub edge_wan_interfaces: WanInterfaces,
    #[builder(default)]
    #[serde(default)]
    pub number_of_retries: u32,
    /// In seconds.
    #[builder(default = "default_retry_interval()")]
    #[serde(default = "default_retry_interval")]
    pub retry_interval: u64,
}

impl AttachmentSpec {
    /// Parse a YAML declaration of an attachment.
    pub fn from_yaml(input: &str) -> Result<Self, ConfigError> {
        serde_yaml_ng::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// A declaration with every optional field at its default.
    #[must_use]
    pub fn new(spoke: &str, transit: &str) -> Self {
        Self {
            spoke_gw_name: spoke.to_owned(),
            transit_gw_name: transit.to_owned(),
            enable_over_private_network: true,
            enable_jumbo_frame: false,
            enable_insane_mode: false,
            insane_mode_tunnel_number: 0,
            enable_max_performance: true,
            spoke_prepend_as_path: AsPath::empty(),
            transit_prepend_as_path: AsPath::empty(),
            edge_wan_interfaces: WanInterfaces::new(),
            number_of_retries: 0,
            retry_interval: default_retry_interval(),
        }
    }

    /// The identity of the attachment this declaration describes.
    #[must_use]
    pub fn identity(&self) -> AttachmentIdentity {
        AttachmentIdentity::new(self.spoke_gw_name.as_str(), self.transit_gw_name.as_str())
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.number_of_retries,
            Duration::from_secs(self.retry_interval),
        )
    }

    /// The prepend path configured in one direction.
    #[must_use]
    pub fn prepend_path(&self, direction: Direction) -> &AsPath {
        match direction {
            Direction::SpokeToTransit => &self.spoke_prepend_as_path,
            Direction::TransitToSpoke => &self.transit_prepend_as_path,
        }
    }

    pub fn prepend_path_mut(&mut self, direction: Direction) -> &mut AsPath {
        match direction {
            Direction::SpokeToTransit => &mut self.spoke_prepend_as_path,
            Direction::TransitToSpoke => &mut self.transit_prepend_as_path,
        }
    }

    /// The immutable fields whose value differs between `self` and `other`.
    #[must_use]
    pub fn immutable_changes(&self, other: &Self) -> Vec<ImmutableField> {
        let mut changed = vec![];
        if self.spoke_gw_name != other.spoke_gw_name {
            changed.push(ImmutableField::SpokeGwName);
        }
        if self.transit_gw_name != other.transit_gw_name {
            changed.push(ImmutableField::TransitGwName);
        }
        if self.enable_over_private_network != other.enable_over_private_network {
            changed.push(ImmutableField::EnableOverPrivateNetwork);
        }
        if self.enable_jumbo_frame != other.enable_jumbo_frame {
            changed.push(ImmutableField::EnableJumboFrame);
        }
        if self.enable_insane_mode != other.enable_insane_mode {
            changed.push(ImmutableField::EnableInsaneMode);
        }
        if self.enable_max_performance != other.enable_max_performance {
            changed.push(ImmutableField::EnableMaxPerformance);
        }
        if self.edge_wan_interfaces != other.edge_wan_interfaces {
            changed.push(ImmutableField::EdgeWanInterfaces);
        }
        if !changed.is_empty() {
            debug!("Immutable fields changed for {}: {changed:?}", self.identity());
        }
        changed
    }

    /// The mutable fields whose value differs between `self` and `other`.
    ///
    /// The tunnel count is only compared when insane mode is enabled on both sides, since it is
    /// ignored otherwise.
    #[must_use]
    pub fn mutable_changes(&self, other: &Self) -> Vec<MutableField> {
        let mut changed = vec![];
        if self.spoke_prepend_as_path != other.spoke_prepend_as_path {
            changed.push(MutableField::SpokePrependAsPath);
        }
        if self.transit_prepend_as_path != other.transit_prepend_as_path {
            changed.push(MutableField::TransitPrependAsPath);
        }
        if self.enable_insane_mode
            && other.enable_insane_mode
            && self.insane_mode_tunnel_number != other.insane_mode_tunnel_number
        {
            changed.push(MutableField::InsaneModeTunnelNumber);
        }
        changed
    }
}

#[cfg(any(test, feature = "bolero"))]
mod contract {
    use crate::attachment::{AttachmentSpec, WanInterfaces};
    use crate::descriptor::{PRIVATE_NETWORK_TUNNELS, PUBLIC_NETWORK_TUNNELS};
    use bolero::{Driver, TypeGenerator};

    /// Generates declarations which pass validation.
    impl TypeGenerator for AttachmentSpec {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            let spoke = format!("spoke-{}", driver.produce::<u8>()?);
            let transit = format!("transit-{}", driver.produce::<u8>()?);
            let mut spec = AttachmentSpec::new(&spoke, &transit);
            spec.enable_over_private_network = driver.produce()?;
            spec.enable_jumbo_frame = driver.produce()?;
            spec.enable_insane_mode = driver.produce()?;
            spec.enable_max_performance = driver.produce()?;
            let range = if spec.enable_over_private_network {
                PRIVATE_NETWORK_TUNNELS
            } else {
                PUBLIC_NETWORK_TUNNELS
            };
            let span = u64::try_from(range.end() - range.start() + 1).ok()?;
            let offset = i64::try_from(driver.produce::<u64>()? % span).ok()?;
            spec.insane_mode_tunnel_number = range.start() + offset;
            spec.spoke_prepend_as_path = driver.produce()?;
            spec.transit_prepend_as_path = driver.produce()?;
            let wan = driver.produce::<u8>()? % 4;
            spec.edge_wan_interfaces = (1..=wan).map(|n| format!("eth{n}")).collect::<WanInterfaces>();
            spec.number_of_retries = u32::from(driver.produce::<u8>()? % 4);
            spec.retry_interval = 1 + u64::from(driver.produce::<u8>()? % 60);
            Some(spec)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builder_defaults_match_new() {
        let built = AttachmentSpecBuilder::default()
            .spoke_gw_name("edge-1")
            .transit_gw_name("hub-1")
            .build()
            .unwrap();
        assert_eq!(built, AttachmentSpec::new("edge-1", "hub-1"));
        assert_eq!(built.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn generated_declarations_are_valid() {
        bolero::check!()
            .with_type()
            .for_each(|spec: &AttachmentSpec| {
                assert_eq!(spec.validate(), Ok(()));
                assert!(spec.immutable_changes(spec).is_empty());
                assert!(spec.mutable_changes(spec).is_empty());
            });
    }

    #[test]
    fn builder_requires_names() {
        assert!(
            AttachmentSpecBuilder::default()
                .spoke_gw_name("edge-1")
                .build()
                .is_err()
        );
    }

    #[test]
    fn yaml_declaration() {
        let spec = AttachmentSpec::from_yaml(
            r#"
spoke_gw_name: edge-1
transit_gw_name: hub-1
enable_insane_mode: true
insane_mode_tunnel_number: 4
spoke_prepend_as_path: ["65001", "65001"]
edge_wan_interfaces: [eth2, eth1]
number_of_retries: 3
retry_interval: 10
"#,
        )
        .unwrap();
        assert_eq!(spec.identity().to_string(), "edge-1~hub-1");
        assert!(spec.enable_over_private_network);
        assert!(spec.enable_max_performance);
        assert_eq!(spec.spoke_prepend_as_path.to_string(), "65001 65001");
        assert!(spec.transit_prepend_as_path.is_empty());
        assert_eq!(
            spec.edge_wan_interfaces.iter().collect::<Vec<_>>(),
            vec!["eth1", "eth2"]
        );
        assert_eq!(
            spec.retry_policy(),
            RetryPolicy::new(3, Duration::from_secs(10))
        );
    }

    #[test]
    fn yaml_rejects_bad_input() {
        let bad_asn = "spoke_gw_name: a\ntransit_gw_name: b\nspoke_prepend_as_path: [\"0\"]\n";
        assert!(matches!(
            AttachmentSpec::from_yaml(bad_asn),
            Err(ConfigError::Parse(_))
        ));
        let unknown = "spoke_gw_name: a\ntransit_gw_name: b\nbogus: 1\n";
        assert!(matches!(
            AttachmentSpec::from_yaml(unknown),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn field_changes() {
        let old = AttachmentSpec::new("edge-1", "hub-1");
        let mut new = old.clone();
        assert!(old.immutable_changes(&new).is_empty());
        assert!(old.mutable_changes(&new).is_empty());

        new.transit_gw_name = "hub-2".to_string();
        new.enable_jumbo_frame = true;
        new.transit_prepend_as_path = AsPath::parse(["65002"]).unwrap();
        assert_eq!(
            old.immutable_changes(&new),
            vec![ImmutableField::TransitGwName, ImmutableField::EnableJumboFrame]
        );
        assert_eq!(
            old.mutable_changes(&new),
            vec![MutableField::TransitPrependAsPath]
        );
    }

    #[test]
    fn tunnel_count_ignored_without_insane_mode() {
        let old = AttachmentSpec::new("edge-1", "hub-1");
        let mut new = old.clone();
        new.insane_mode_tunnel_number = 999;
        assert!(old.mutable_changes(&new).is_empty());

        let mut old = old;
        old.enable_insane_mode = true;
        new.enable_insane_mode = true;
        assert_eq!(
            old.mutable_changes(&new),
            vec![MutableField::InsaneModeTunnelNumber]
        );
    }

    #[test]
    fn directions() {
        let mut spec = AttachmentSpec::new("edge-1", "hub-1");
        spec.spoke_prepend_as_path = AsPath::parse(["65001"]).unwrap();
        assert_eq!(spec.prepend_path(Direction::SpokeToTransit).to_string(), "65001");
        assert!(spec.prepend_path(Direction::TransitToSpoke).is_empty());
        let id = spec.identity();
        assert_eq!(id.endpoints(Direction::SpokeToTransit), ("edge-1", "hub-1"));
        assert_eq!(id.endpoints(Direction::TransitToSpoke), ("hub-1", "edge-1"));
        spec.prepend_path_mut(Direction::TransitToSpoke).clone_from(&AsPath::parse(["65002"]).unwrap());
        assert_eq!(spec.transit_prepend_as_path.to_string(), "65002");
        assert_eq!(Direction::TransitToSpoke.to_string(), "transit to spoke");
        assert_eq!(
            Direction::TransitToSpoke.field().to_string(),
            "transit_prepend_as_path"
        );
    }

    #[test]
    fn retry_budget() {
        let none = RetryPolicy::default();
        assert!(!none.should_retry(0));
        let two = RetryPolicy::new(2, Duration::from_secs(1));
        assert!(two.should_retry(0));
        assert!(two.should_retry(1));
        assert!(!two.should_retry(2));
    }
}
