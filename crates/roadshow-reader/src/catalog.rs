//! Catalog sources and lazy catalog loading.
//!
//! The scenario's `Catalogs` element declares one file per catalog kind.
//! Files are parsed on the first entry lookup for their kind and the
//! parsed entries are reused for every later lookup. Lookups that fail
//! return `None` with a diagnostic; a missing catalog is never fatal.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use roadshow_types::{Catalog, CatalogEntry, CatalogKind, CatalogPayload, EntityPool};
use tracing::{debug, info, warn};

use crate::params::ParameterTable;
use crate::reader;

/// Declared catalog files plus the lazily parsed results.
#[derive(Debug, Default)]
pub struct CatalogSet {
    /// Directory the scenario file lives in; catalog paths are relative
    /// to it.
    base_dir: PathBuf,
    /// Declared file per kind, from the `Catalogs` element.
    sources: BTreeMap<CatalogKind, PathBuf>,
    /// Parse result per kind. An entry means the load was attempted;
    /// `None` records a failed load so it is not retried every lookup.
    loaded: BTreeMap<CatalogKind, Option<Catalog>>,
}

impl CatalogSet {
    /// Create a catalog set rooted at the scenario file's directory.
    pub fn new(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_owned(),
            sources: BTreeMap::new(),
            loaded: BTreeMap::new(),
        }
    }

    /// Declare the source file for one catalog kind.
    ///
    /// A second declaration for the same kind replaces the first with a
    /// diagnostic.
    pub fn declare(&mut self, kind: CatalogKind, relative_path: &str) {
        let path = self.base_dir.join(relative_path);
        if let Some(previous) = self.sources.insert(kind, path) {
            warn!(%kind, previous = %previous.display(), "catalog source re-declared, keeping the later one");
        }
    }

    /// Whether a source file has been declared for the kind.
    pub fn has_source(&self, kind: CatalogKind) -> bool {
        self.sources.contains_key(&kind)
    }

    /// Look up a catalog entry, loading the kind's file on first use.
    ///
    /// Returns a deep-cloned entry; the stored template is never aliased.
    pub fn find_entry(
        &mut self,
        kind: CatalogKind,
        catalog_name: &str,
        entry_name: &str,
        params: &ParameterTable,
        entities: &EntityPool,
    ) -> Option<CatalogEntry> {
        self.ensure_loaded(kind, params, entities);
        let catalog = self.loaded.get(&kind).and_then(Option::as_ref)?;
        if catalog.name != catalog_name {
            warn!(
                %kind,
                requested = catalog_name,
                available = catalog.name,
                "no catalog with that name"
            );
            return None;
        }
        let entry = catalog.entry(entry_name);
        if entry.is_none() {
            warn!(%kind, catalog = catalog_name, entry = entry_name, "catalog entry not found");
        }
        entry.cloned()
    }

    /// Parse the kind's declared file if it has not been attempted yet.
    fn ensure_loaded(&mut self, kind: CatalogKind, params: &ParameterTable, entities: &EntityPool) {
        if self.loaded.contains_key(&kind) {
            return;
        }
        let Some(path) = self.sources.get(&kind).cloned() else {
            warn!(%kind, "no catalog source declared for kind");
            self.loaded.insert(kind, None);
            return;
        };
        let catalog = load_catalog_file(&path, kind, params, entities);
        self.loaded.insert(kind, catalog);
    }
}

/// Read and parse one catalog file.
fn load_catalog_file(
    path: &Path,
    kind: CatalogKind,
    params: &ParameterTable,
    entities: &EntityPool,
) -> Option<Catalog> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(source) => {
            warn!(%kind, path = %path.display(), error = %source, "could not read catalog file");
            return None;
        }
    };
    let doc = match roxmltree::Document::parse(&text) {
        Ok(doc) => doc,
        Err(source) => {
            warn!(%kind, path = %path.display(), error = %source, "could not parse catalog file");
            return None;
        }
    };

    let Some(catalog_node) = doc
        .root()
        .children()
        .find(|n| n.has_tag_name("OpenSCENARIO"))
        .and_then(|n| n.children().find(|c| c.has_tag_name("Catalog")))
    else {
        warn!(%kind, path = %path.display(), "catalog file has no OpenSCENARIO/Catalog element");
        return None;
    };

    let name = params.resolve(catalog_node.attribute("name").unwrap_or(""));
    if name.is_empty() {
        warn!(%kind, path = %path.display(), "catalog lacks a name");
    }

    let mut entries = Vec::new();
    for child in catalog_node.children().filter(roxmltree::Node::is_element) {
        match kind {
            CatalogKind::Vehicle => {
                if child.has_tag_name("Vehicle") {
                    let vehicle = reader::parse_vehicle_node(&child, params);
                    entries.push(CatalogEntry {
                        name: vehicle.name.clone(),
                        payload: CatalogPayload::Vehicle(vehicle),
                    });
                } else {
                    warn!(element = child.tag_name().name(), "unexpected vehicle catalog entry");
                }
            }
            CatalogKind::Route => {
                if child.has_tag_name("Route") {
                    if let Some(route) = reader::parse_route_node(&child, params, entities) {
                        entries.push(CatalogEntry {
                            name: route.name.clone(),
                            payload: CatalogPayload::Route(route),
                        });
                    }
                } else {
                    warn!(element = child.tag_name().name(), "unexpected route catalog entry");
                }
            }
            CatalogKind::Maneuver => {
                // Maneuver templates stay detached XML; one template is
                // expanded once per referencing sequence and actor.
                let entry_name = params.resolve(child.attribute("name").unwrap_or(""));
                let Some(xml) = text.get(child.range()) else {
                    warn!(entry = entry_name, "could not slice maneuver template text");
                    continue;
                };
                debug!(entry = entry_name, "stored maneuver template");
                entries.push(CatalogEntry {
                    name: entry_name,
                    payload: CatalogPayload::ManeuverXml(xml.to_owned()),
                });
            }
        }
    }

    info!(%kind, catalog = name, entries = entries.len(), path = %path.display(), "catalog loaded");
    Some(Catalog { name, entries })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const VEHICLE_CATALOG: &str = r#"<?xml version="1.0"?>
<OpenSCENARIO>
  <Catalog name="VehicleCatalog">
    <Vehicle name="car_red" category="car">
      <Properties>
        <Property name="model_id" value="2"/>
      </Properties>
    </Vehicle>
    <Vehicle name="truck_blue" category="truck"/>
  </Catalog>
</OpenSCENARIO>
"#;

    fn lookup(set: &mut CatalogSet, entry: &str) -> Option<CatalogEntry> {
        set.find_entry(
            CatalogKind::Vehicle,
            "VehicleCatalog",
            entry,
            &ParameterTable::new(),
            &EntityPool::new(),
        )
    }

    #[test]
    fn second_reference_reuses_the_parsed_catalog() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vehicles.xml"), VEHICLE_CATALOG).unwrap();
        let mut set = CatalogSet::new(dir.path());
        set.declare(CatalogKind::Vehicle, "vehicles.xml");

        let first = lookup(&mut set, "car_red").unwrap();
        assert_eq!(first.name, "car_red");

        // Remove the file; the second reference must come from the
        // cached parse, not a re-read.
        std::fs::remove_file(dir.path().join("vehicles.xml")).unwrap();
        let second = lookup(&mut set, "truck_blue").unwrap();
        assert_eq!(second.name, "truck_blue");
        assert!(matches!(second.payload, CatalogPayload::Vehicle(_)));
    }

    #[test]
    fn failed_load_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = CatalogSet::new(dir.path());
        set.declare(CatalogKind::Vehicle, "absent.xml");

        assert!(lookup(&mut set, "car_red").is_none());

        // The file appearing later changes nothing; the failed load is
        // memoized on the first attempt.
        std::fs::write(dir.path().join("absent.xml"), VEHICLE_CATALOG).unwrap();
        assert!(lookup(&mut set, "car_red").is_none());
    }

    #[test]
    fn undeclared_kind_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = CatalogSet::new(dir.path());
        assert!(!set.has_source(CatalogKind::Route));
        assert!(lookup(&mut set, "car_red").is_none());
    }
}
