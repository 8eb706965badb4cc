//! Catalog structures: named template libraries.
//!
//! Catalog entries are templates. Vehicle and route entries are parsed
//! eagerly when their catalog file loads; maneuver entries stay detached
//! XML text because one template is expanded once per referencing
//! sequence and actor, with the actor bound at expansion time.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::VehicleSpec;
use crate::position::RouteSpec;

/// Which template library a catalog provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CatalogKind {
    /// Vehicle definitions.
    Vehicle,
    /// Routes.
    Route,
    /// Maneuver templates.
    Maneuver,
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Vehicle => "vehicle",
            Self::Route => "route",
            Self::Maneuver => "maneuver",
        };
        f.write_str(label)
    }
}

/// Template payload of one catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CatalogPayload {
    /// A vehicle template, cloned into entities that reference it.
    Vehicle(VehicleSpec),
    /// A route template, cloned into positions and follow-route actions.
    Route(RouteSpec),
    /// A maneuver template kept as its XML subtree, re-parsed per use.
    ManeuverXml(String),
}

impl CatalogPayload {
    /// The catalog kind this payload belongs to.
    pub const fn kind(&self) -> CatalogKind {
        match self {
            Self::Vehicle(_) => CatalogKind::Vehicle,
            Self::Route(_) => CatalogKind::Route,
            Self::ManeuverXml(_) => CatalogKind::Maneuver,
        }
    }
}

/// One named template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Entry name, unique within its catalog.
    pub name: String,
    /// The template itself.
    pub payload: CatalogPayload,
}

/// A parsed catalog file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Catalog name from the file.
    pub name: String,
    /// Entries in file order.
    pub entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Look up an entry by name.
    pub fn entry(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}
