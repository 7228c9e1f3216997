use serde::{Deserialize, Serialize};
use std::fmt;

/// Collections mirrored between the device and the remote backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Customers,
}

impl Collection {
    pub const ALL: [Collection; 1] = [Collection::Customers];

    /// Table name on both sides of the wire.
    pub fn table_name(&self) -> &'static str {
        match self {
            Collection::Customers => "customers",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

impl TryFrom<&str> for Collection {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "customers" => Ok(Collection::Customers),
            other => Err(format!("Unknown collection: {other}")),
        }
    }
}
