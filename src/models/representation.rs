//! Representation enum distinguishing node and edge entries.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a schema entry is materialized in the property graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Representation {
    Node,
    Edge,
}

impl Representation {
    /// Returns the keyword used in the schema document.
    pub fn as_str(&self) -> &'static str {
        match self {
            Representation::Node => "node",
            Representation::Edge => "edge",
        }
    }
}

impl std::fmt::Display for Representation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Representation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node" => Ok(Representation::Node),
            "edge" => Ok(Representation::Edge),
            _ => Err(format!(
                "Invalid representation '{}'. Valid values: node, edge",
                s
            )),
        }
    }
}
