//! Vehicle definitions and the scenario entity pool.
//!
//! A [`VehicleSpec`] is immutable once constructed. It is either parsed
//! inline from the scenario document or deep-cloned from a catalog entry;
//! cloned specs share nothing with their template, so mutating one
//! instantiated entity can never leak into another.

use serde::{Deserialize, Serialize};

use crate::ids::EntityId;

/// Vehicle body dimensions in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Length along the vehicle's longitudinal axis.
    pub length: f64,
    /// Width across the vehicle.
    pub width: f64,
    /// Height above the ground plane.
    pub height: f64,
}

impl Default for Dimensions {
    /// Passenger-car defaults used when the document gives no dimensions.
    fn default() -> Self {
        Self {
            length: 5.0,
            width: 2.0,
            height: 1.5,
        }
    }
}

/// Vehicle category token from the scenario document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleCategory {
    /// Passenger car.
    Car,
    /// Van.
    Van,
    /// Truck.
    Truck,
    /// Towed trailer.
    Trailer,
    /// Semi-trailer.
    Semitrailer,
    /// Bus.
    Bus,
    /// Motorbike.
    Motorbike,
    /// Bicycle.
    Bicycle,
    /// Train.
    Train,
    /// Tram.
    Tram,
    /// Unrecognized category token, preserved for diagnostics.
    Other,
}

/// One name/value pair from a vehicle's property list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    /// Property name as written in the document.
    pub name: String,
    /// Raw property value.
    pub value: String,
}

/// Free-form property bag attached to a vehicle definition.
///
/// Known properties (`control`, `model_id`) are lifted into dedicated
/// [`VehicleSpec`] fields by the reader; the raw bag is retained so
/// downstream consumers can inspect properties the engine ignores.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PropertySet {
    /// All name/value pairs in document order.
    pub entries: Vec<Property>,
    /// Optional file reference from the property list.
    pub file: Option<String>,
}

impl PropertySet {
    /// Look up a property value by name.
    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }
}

/// Immutable vehicle definition, inline or cloned from a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSpec {
    /// Vehicle name (the catalog entry name for cloned specs).
    pub name: String,
    /// Vehicle category.
    pub category: VehicleCategory,
    /// Numeric 3D-model id used by renderers and the recording format.
    pub model_id: i32,
    /// Optional path to a 3D-model file.
    pub model_path: Option<String>,
    /// Whether the entity is driven externally rather than by the story.
    pub control_external: bool,
    /// Body dimensions.
    pub dimensions: Dimensions,
    /// Raw property bag as parsed.
    pub properties: PropertySet,
}

/// Load-time override for the scenario's external-control flags.
///
/// `ByScenario` honors whatever the document declares. The force modes
/// pin the first entity's (the ego's) flag regardless of the document,
/// so the same scenario can be replayed with or without an external
/// driver attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ControlOverride {
    /// Honor the `control=external` vehicle property.
    #[default]
    ByScenario,
    /// Force the ego entity to scenario control.
    ForceOff,
    /// Force the ego entity to external control.
    ForceOn,
}

/// A scenario actor: identity plus its vehicle definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Declaration-order id.
    pub id: EntityId,
    /// Unique entity name from the document.
    pub name: String,
    /// The entity's vehicle definition.
    pub vehicle: VehicleSpec,
}

/// Insertion-ordered entity collection with name lookup.
///
/// Ids are dense indexes into the underlying list, so `by_id` is a direct
/// table access and iteration order always matches declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityPool {
    entities: Vec<Entity>,
}

impl EntityPool {
    /// Create an empty pool.
    pub const fn new() -> Self {
        Self {
            entities: Vec::new(),
        }
    }

    /// Add an entity and return its assigned id.
    ///
    /// The caller is responsible for name uniqueness; the reader rejects
    /// duplicate names before insertion. Saturates at `u32::MAX` entities.
    pub fn add(&mut self, name: String, vehicle: VehicleSpec) -> EntityId {
        let id = EntityId::new(u32::try_from(self.entities.len()).unwrap_or(u32::MAX));
        self.entities.push(Entity { id, name, vehicle });
        id
    }

    /// Look up an entity by id.
    pub fn by_id(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.as_usize())
    }

    /// Look up an entity by name.
    pub fn by_name(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Resolve a name to an id.
    pub fn id_of(&self, name: &str) -> Option<EntityId> {
        self.by_name(name).map(|e| e.id)
    }

    /// Replace the external-control flag of one entity.
    ///
    /// Used by the reader when a load-time [`ControlOverride`] pins the
    /// ego's control mode. Unknown ids are ignored.
    pub fn set_external(&mut self, id: EntityId, external: bool) {
        if let Some(entity) = self.entities.get_mut(id.as_usize()) {
            entity.vehicle.control_external = external;
        }
    }

    /// Number of entities in the pool.
    pub const fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the pool holds no entities.
    pub const fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate entities in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn make_vehicle(name: &str) -> VehicleSpec {
        VehicleSpec {
            name: name.to_owned(),
            category: VehicleCategory::Car,
            model_id: 0,
            model_path: None,
            control_external: false,
            dimensions: Dimensions::default(),
            properties: PropertySet::default(),
        }
    }

    #[test]
    fn pool_assigns_ids_in_declaration_order() {
        let mut pool = EntityPool::new();
        let ego = pool.add("Ego".to_owned(), make_vehicle("car_white"));
        let target = pool.add("Target".to_owned(), make_vehicle("car_red"));

        assert_eq!(ego.index(), 0);
        assert_eq!(target.index(), 1);
        assert_eq!(pool.len(), 2);

        let names: Vec<&str> = pool.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Ego", "Target"]);
    }

    #[test]
    fn pool_resolves_names_and_ids() {
        let mut pool = EntityPool::new();
        let id = pool.add("Target".to_owned(), make_vehicle("car_red"));

        assert_eq!(pool.id_of("Target"), Some(id));
        assert_eq!(pool.by_id(id).unwrap().name, "Target");
        assert!(pool.by_name("missing").is_none());
        assert!(pool.id_of("missing").is_none());
    }

    #[test]
    fn cloned_vehicle_specs_are_independent() {
        let template = make_vehicle("car_white");
        let mut first = template.clone();
        let second = template.clone();

        first.control_external = true;
        assert!(!second.control_external);
        assert!(!template.control_external);
    }

    #[test]
    fn set_external_flips_only_the_target() {
        let mut pool = EntityPool::new();
        let ego = pool.add("Ego".to_owned(), make_vehicle("car_white"));
        let other = pool.add("Other".to_owned(), make_vehicle("car_red"));

        pool.set_external(ego, true);
        assert!(pool.by_id(ego).unwrap().vehicle.control_external);
        assert!(!pool.by_id(other).unwrap().vehicle.control_external);
    }

    #[test]
    fn property_lookup_finds_first_match() {
        let props = PropertySet {
            entries: vec![
                Property {
                    name: "control".to_owned(),
                    value: "external".to_owned(),
                },
                Property {
                    name: "model_id".to_owned(),
                    value: "2".to_owned(),
                },
            ],
            file: None,
        };
        assert_eq!(props.value_of("control"), Some("external"));
        assert_eq!(props.value_of("model_id"), Some("2"));
        assert!(props.value_of("color").is_none());
    }
}
