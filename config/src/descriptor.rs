// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Normalized attach request, as transmitted to the controller

use std::ops::RangeInclusive;

use serde::Serialize;
use tracing::debug;

use crate::attachment::AttachmentSpec;
use crate::errors::{ConfigError, ConfigResult};
use crate::identity::{AttachmentIdentity, IDENTITY_SEPARATOR};

/// Allowed insane mode tunnel counts when the attachment runs over a private network.
pub const PRIVATE_NETWORK_TUNNELS: RangeInclusive<i64> = 0..=49;
/// Allowed insane mode tunnel counts when the attachment runs over the public internet.
pub const PUBLIC_NETWORK_TUNNELS: RangeInclusive<i64> = 2..=20;

/// Check an insane mode tunnel count against the range allowed for the network type.
pub fn validate_tunnel_count(count: i64, over_private_network: bool) -> ConfigResult {
    let (range, network) = if over_private_network {
        (PRIVATE_NETWORK_TUNNELS, "over private network")
    } else {
        (PUBLIC_NETWORK_TUNNELS, "over public network")
    };
    if range.contains(&count) {
        Ok(())
    } else {
        Err(ConfigError::TunnelCountOutOfRange {
            count,
            min: *range.start(),
            max: *range.end(),
            network,
        })
    }
}

fn validate_gw_name(name: &str, what: &'static str) -> ConfigResult {
    if name.is_empty() {
        return Err(ConfigError::MissingParameter(what));
    }
    if name.contains(IDENTITY_SEPARATOR) {
        return Err(ConfigError::BadGatewayName(name.to_string()));
    }
    Ok(())
}

/// The attach request for one attachment, built from a validated [`AttachmentSpec`].
///
/// Prepend paths are not part of the request: they are configured with separate calls once the
/// attachment exists.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct AttachmentDescriptor {
    pub spoke_gw_name: String,
    pub transit_gw_name: String,
    pub enable_over_private_network: bool,
    pub enable_jumbo_frame: bool,
    pub enable_insane_mode: bool,
    /// `None` unless insane mode is enabled.
    pub insane_mode_tunnel_number: Option<u32>,
    pub enable_max_performance: bool,
    /// Sorted, comma-joined. Empty when the controller should pick the interfaces.
    pub edge_wan_interfaces: String,
}

impl AttachmentDescriptor {
    #[must_use]
    pub fn identity(&self) -> AttachmentIdentity {
        AttachmentIdentity::new(self.spoke_gw_name.as_str(), self.transit_gw_name.as_str())
    }

    /// The WAN interfaces as a list, in transmission order.
    pub fn wan_interfaces(&self) -> impl Iterator<Item = &str> {
        self.edge_wan_interfaces
            .split(',')
            .filter(|name| !name.is_empty())
    }
}

impl AttachmentSpec {
    /// Validate the declaration without building anything.
    pub fn validate(&self) -> ConfigResult {
        validate_gw_name(&self.spoke_gw_name, "spoke_gw_name")?;
        validate_gw_name(&self.transit_gw_name, "transit_gw_name")?;
        if self.enable_insane_mode {
            validate_tunnel_count(
                self.insane_mode_tunnel_number,
                self.enable_over_private_network,
            )?;
        }
        self.spoke_prepend_as_path.validate("spoke_prepend_as_path")?;
        self.transit_prepend_as_path
            .validate("transit_prepend_as_path")?;
        if self.number_of_retries > 0 && self.retry_interval == 0 {
            return Err(ConfigError::BadRetryInterval);
        }
        Ok(())
    }

    /// Validate and build the attach request.
    ///
    /// This performs no I/O.
    pub fn build_descriptor(&self) -> Result<AttachmentDescriptor, ConfigError> {
        AttachmentDescriptor::try_from(self)
    }
}

impl TryFrom<&AttachmentSpec> for AttachmentDescriptor {
    type Error = ConfigError;

    #[tracing::instrument(level = "trace", ret)]
    fn try_from(spec: &AttachmentSpec) -> Result<Self, Self::Error> {
        spec.validate()?;
        let insane_mode_tunnel_number = if spec.enable_insane_mode {
            // validated above, within [0, 49]
            u32::try_from(spec.insane_mode_tunnel_number).ok()
        } else {
            None
        };
        // BTreeSet iteration is sorted, which gives a stable wire form
        let edge_wan_interfaces = spec
            .edge_wan_interfaces
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",");
        debug!(
            "Built attach request for {}: wan interfaces '{edge_wan_interfaces}'",
            spec.identity()
        );
        Ok(AttachmentDescriptor {
            spoke_gw_name: spec.spoke_gw_name.clone(),
            transit_gw_name: spec.transit_gw_name.clone(),
            enable_over_private_network: spec.enable_over_private_network,
            enable_jumbo_frame: spec.enable_jumbo_frame,
            enable_insane_mode: spec.enable_insane_mode,
            insane_mode_tunnel_number,
            enable_max_performance: spec.enable_max_performance,
            edge_wan_interfaces,
        })
    }
}
