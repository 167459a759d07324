// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Observed state of an attachment, as reported by the controller

use serde::{Deserialize, Serialize};

use crate::aspath::AsPath;
use crate::attachment::{AttachmentSpec, WanInterfaces};
use crate::identity::AttachmentIdentity;

/// What the controller reports about an existing attachment.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ObservedAttachment {
    pub spoke_gw_name: String,
    pub transit_gw_name: String,
    pub enable_over_private_network: bool,
    pub enable_jumbo_frame: bool,
    pub enable_insane_mode: bool,
    pub insane_mode_tunnel_number: u32,
    pub enable_max_performance: bool,
    pub spoke_prepend_as_path: AsPath,
    pub transit_prepend_as_path: AsPath,
    /// The WAN interfaces actually in use, which the controller fills in when none were requested.
    pub edge_wan_interfaces: WanInterfaces,
}

impl ObservedAttachment {
    #[must_use]
    pub fn identity(&self) -> AttachmentIdentity {
        AttachmentIdentity::new(self.spoke_gw_name.as_str(), self.transit_gw_name.as_str())
    }

    /// Overwrite the fields of a declaration with what was observed.
    ///
    /// The retry policy is never observed and stays as declared. WAN interfaces are only written
    /// when `with_wan_interfaces` is set, so that controller-computed defaults do not show up as
    /// a perpetual difference against a declaration that left them empty.
    pub fn refresh(&self, spec: &mut AttachmentSpec, with_wan_interfaces: bool) {
        spec.spoke_gw_name.clone_from(&self.spoke_gw_name);
        spec.transit_gw_name.clone_from(&self.transit_gw_name);
        spec.enable_over_private_network = self.enable_over_private_network;
        spec.enable_jumbo_frame = self.enable_jumbo_frame;
        spec.enable_insane_mode = self.enable_insane_mode;
        if self.enable_insane_mode {
            spec.insane_mode_tunnel_number = i64::from(self.insane_mode_tunnel_number);
        }
        spec.enable_max_performance = self.enable_max_performance;
        spec.spoke_prepend_as_path.clone_from(&self.spoke_prepend_as_path);
        spec.transit_prepend_as_path
            .clone_from(&self.transit_prepend_as_path);
        if with_wan_interfaces {
            spec.edge_wan_interfaces.clone_from(&self.edge_wan_interfaces);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn observed() -> ObservedAttachment {
        ObservedAttachment {
            spoke_gw_name: "edge-1".to_string(),
            transit_gw_name: "hub-1".to_string(),
            enable_over_private_network: true,
            enable_insane_mode: true,
            insane_mode_tunnel_number: 8,
            enable_max_performance: true,
            transit_prepend_as_path: AsPath::parse(["65002", "65002"]).unwrap(),
            edge_wan_interfaces: WanInterfaces::from(["eth1".to_string()]),
            ..Default::default()
        }
    }

    #[test]
    fn refresh_keeps_retry_policy() {
        let mut spec = AttachmentSpec::new("edge-1", "hub-1");
        spec.number_of_retries = 4;
        spec.retry_interval = 30;
        observed().refresh(&mut spec, true);
        assert_eq!(spec.number_of_retries, 4);
        assert_eq!(spec.retry_interval, 30);
        assert!(spec.enable_insane_mode);
        assert_eq!(spec.insane_mode_tunnel_number, 8);
        assert_eq!(spec.transit_prepend_as_path.to_string(), "65002 65002");
        assert_eq!(spec.edge_wan_interfaces, observed().edge_wan_interfaces);
    }

    #[test]
    fn refresh_without_wan_interfaces() {
        let mut spec = AttachmentSpec::new("edge-1", "hub-1");
        observed().refresh(&mut spec, false);
        assert!(spec.edge_wan_interfaces.is_empty());
        assert_eq!(spec.identity(), observed().identity());
    }
}
