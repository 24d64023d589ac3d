//! Topology builder settings.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// How subnets with more than two members become links.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkPolicy {
    #[default]
    FullMesh,
    HubAndSpoke,
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone, Default, PartialEq)]
pub struct TopologyConfig {
    #[serde(default)]
    pub link_policy: LinkPolicy,
}
