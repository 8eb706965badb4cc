//! Single-pass scenario document parser.
//!
//! Walks the scenario XML top to bottom and produces the document model:
//! parameters, road-network file references, catalog sources, entities,
//! init actions, and the story graph. Parsing is best-effort: unknown or
//! malformed elements are logged and skipped, and entity references that
//! do not resolve drop the referencing element with a diagnostic. Only an
//! unparsable top-level document or a missing road-logic file fails the
//! load.

use std::path::Path;

use roadshow_types::{
    Act, ActionKind, ActionSpec, CatalogKind, CatalogPayload, Condition, ConditionEdge,
    ConditionGroup, ConditionKind, ControlDomain, ControlOverride, Dimensions, DistanceGap,
    DynamicLimits, DynamicsShape, EntityId, EntityPool, Event, EventPriority, LaneChangeTarget,
    LaneOffsetTarget, Maneuver, MeetingMode, Orientation, OrientationKind, PositionSpec, Property,
    PropertySet, RelativeDistanceKind, RoadFiles, RouteSpec, Rule, ScenarioGraph, Sequence,
    SpeedTarget, SpeedTargetKind, Story, StoryElementKind, TerminationRule, Timing, TimingKind,
    TransitionDynamics, TriggerRule, TriggeringEntities, VehicleCategory, VehicleSpec,
};
use roxmltree::Node;
use tracing::{debug, info, warn};

use crate::catalog::CatalogSet;
use crate::error::ReaderError;
use crate::params::ParameterTable;

/// Load a scenario file from disk.
///
/// Catalog files referenced by the document are resolved relative to the
/// scenario file's directory.
///
/// # Errors
///
/// Returns [`ReaderError`] if the file cannot be read, the document is
/// not well-formed XML, or no road-logic file is declared.
pub fn load(path: &Path, control: ControlOverride) -> Result<ScenarioGraph, ReaderError> {
    info!(path = %path.display(), "loading scenario");
    let text = std::fs::read_to_string(path).map_err(|source| ReaderError::Io {
        path: path.to_owned(),
        source,
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    load_str(&text, base_dir, control)
}

/// Parse a scenario document from a string.
///
/// `base_dir` anchors relative road-network and catalog paths; tests pass
/// a scratch directory.
///
/// # Errors
///
/// Returns [`ReaderError`] if the document fails to parse or declares no
/// road-logic file.
pub fn load_str(
    xml: &str,
    base_dir: &Path,
    control: ControlOverride,
) -> Result<ScenarioGraph, ReaderError> {
    let doc = roxmltree::Document::parse(xml)?;
    let root = doc
        .root()
        .children()
        .find(|n| n.has_tag_name("OpenSCENARIO"))
        .ok_or(ReaderError::MissingRoadLogic)?;

    let mut params = ParameterTable::new();
    if let Some(decl) = child(&root, "ParameterDeclaration") {
        parse_parameter_declaration(&decl, &mut params);
    }

    let description = child(&root, "FileHeader")
        .map(|h| attr(&params, &h, "description"))
        .unwrap_or_default();

    let road_files = parse_road_network(&root, &params, base_dir)?;

    let mut catalogs = CatalogSet::new(base_dir);
    if let Some(catalogs_node) = child(&root, "Catalogs") {
        parse_catalog_sources(&catalogs_node, &params, &mut catalogs);
    }

    let mut entities = EntityPool::new();
    if let Some(entities_node) = child(&root, "Entities") {
        parse_entities(&entities_node, &params, &mut catalogs, &mut entities);
    }
    apply_control_override(control, &mut entities);

    let storyboard = child(&root, "Storyboard");
    let init = storyboard
        .as_ref()
        .map(|sb| parse_init(sb, &params, &entities, &mut catalogs))
        .unwrap_or_default();

    let mut stories = Vec::new();
    if let Some(sb) = storyboard {
        for story_node in sb.children().filter(|n| n.has_tag_name("Story")) {
            stories.push(parse_story(&story_node, &mut params, &entities, &mut catalogs));
        }
    }

    info!(
        entities = entities.len(),
        init_actions = init.len(),
        stories = stories.len(),
        "scenario loaded"
    );

    Ok(ScenarioGraph {
        description,
        road_files,
        entities,
        init,
        stories,
    })
}

/// First element child with the given tag name.
fn child<'a, 'input>(node: &Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

/// Read an attribute with `$` parameter resolution; absent becomes empty.
fn attr(params: &ParameterTable, node: &Node<'_, '_>, name: &str) -> String {
    node.attribute(name).map_or_else(String::new, |raw| params.resolve(raw))
}

/// Read a float attribute; absent or unparsable becomes 0.0.
fn attr_f64(params: &ParameterTable, node: &Node<'_, '_>, name: &str) -> f64 {
    let value = attr(params, node, name);
    if value.is_empty() {
        return 0.0;
    }
    value.parse().unwrap_or_else(|_| {
        warn!(attribute = name, value, "not a number, defaulting to 0");
        0.0
    })
}

/// Read an integer attribute; absent or unparsable becomes 0.
fn attr_i32(params: &ParameterTable, node: &Node<'_, '_>, name: &str) -> i32 {
    let value = attr(params, node, name);
    if value.is_empty() {
        return 0;
    }
    value.parse().unwrap_or_else(|_| {
        warn!(attribute = name, value, "not an integer, defaulting to 0");
        0
    })
}

/// Strict boolean token: exactly `true`/`1` or `false`/`0`, case
/// sensitively. Anything else warns and defaults to `false`.
fn parse_bool(value: &str, what: &str) -> bool {
    match value {
        "true" | "1" => true,
        "" | "false" | "0" => false,
        other => {
            warn!(attribute = what, value = other, "invalid boolean, defaulting to false");
            false
        }
    }
}

fn attr_bool(params: &ParameterTable, node: &Node<'_, '_>, name: &str) -> bool {
    parse_bool(&attr(params, node, name), name)
}

fn parse_parameter_declaration(node: &Node<'_, '_>, params: &mut ParameterTable) {
    for decl in node.children().filter(Node::is_element) {
        params.add(
            decl.attribute("name").unwrap_or(""),
            decl.attribute("type").unwrap_or("string"),
            decl.attribute("value").unwrap_or(""),
        );
    }
}

/// Parse the `RoadNetwork` element into file references.
///
/// The road-logic file is required. A missing scene-graph file defaults
/// to a sibling `models/` directory with a warning, since that path is
/// also used to locate vehicle models.
fn parse_road_network(
    root: &Node<'_, '_>,
    params: &ParameterTable,
    base_dir: &Path,
) -> Result<RoadFiles, ReaderError> {
    let network = child(root, "RoadNetwork");
    let read_path = |tag: &str| -> String {
        let Some(network) = network.as_ref() else {
            return String::new();
        };
        let Some(file_node) = child(network, tag) else {
            return String::new();
        };
        let raw = attr(params, &file_node, "filepath");
        // Leading-dot paths are relative to the scenario file.
        if raw.starts_with('.') {
            format!("{}/{raw}", base_dir.display())
        } else {
            raw
        }
    };

    let logic_path = read_path("Logics");
    if logic_path.is_empty() {
        return Err(ReaderError::MissingRoadLogic);
    }

    let mut scene_graph_path = read_path("SceneGraph");
    if scene_graph_path.is_empty() {
        scene_graph_path = format!("{}/../models/", base_dir.display());
        warn!(default = scene_graph_path, "no scene-graph model file declared, using default path");
    }

    info!(logic = logic_path, scene_graph = scene_graph_path, "road network files");
    Ok(RoadFiles {
        logic_path,
        scene_graph_path,
    })
}

fn parse_catalog_sources(node: &Node<'_, '_>, params: &ParameterTable, catalogs: &mut CatalogSet) {
    for catalog_node in node.children().filter(Node::is_element) {
        let kind = match catalog_node.tag_name().name() {
            "VehicleCatalog" => CatalogKind::Vehicle,
            "RouteCatalog" => CatalogKind::Route,
            "ManeuverCatalog" => CatalogKind::Maneuver,
            other => {
                warn!(catalog = other, "catalog kind not supported, skipping");
                continue;
            }
        };
        let Some(directory) = child(&catalog_node, "Directory") else {
            warn!(%kind, "catalog lacks a Directory element, skipping");
            continue;
        };
        let path = attr(params, &directory, "path");
        if path.is_empty() {
            warn!(%kind, "catalog Directory lacks a path, skipping");
            continue;
        }
        catalogs.declare(kind, &path);
    }
}

/// Parse a `Vehicle` element into a spec.
///
/// The `control` and `model_id` properties are lifted into dedicated
/// fields; other properties are retained but warned about.
pub(crate) fn parse_vehicle_node(node: &Node<'_, '_>, params: &ParameterTable) -> VehicleSpec {
    let name = attr(params, node, "name");
    debug!(vehicle = name, "parsing vehicle");
    let category = parse_vehicle_category(&attr(params, node, "category"));

    let mut properties = PropertySet::default();
    if let Some(props_node) = child(node, "Properties") {
        for prop in props_node.children().filter(Node::is_element) {
            match prop.tag_name().name() {
                "File" => {
                    let filepath = attr(params, &prop, "filepath");
                    if !filepath.is_empty() {
                        properties.file = Some(filepath);
                    }
                }
                "Property" => {
                    properties.entries.push(Property {
                        name: attr(params, &prop, "name"),
                        value: attr(params, &prop, "value"),
                    });
                }
                other => warn!(element = other, "unexpected property element"),
            }
        }
    }

    let mut control_external = false;
    let mut model_id = 0;
    for property in &properties.entries {
        match property.name.as_str() {
            "control" => control_external = property.value == "external",
            "model_id" => {
                model_id = property.value.parse().unwrap_or_else(|_| {
                    warn!(value = property.value, "model_id is not an integer, defaulting to 0");
                    0
                });
            }
            other => warn!(property = other, "unsupported vehicle property"),
        }
    }

    VehicleSpec {
        name,
        category,
        model_id,
        model_path: properties.file.clone(),
        control_external,
        dimensions: Dimensions::default(),
        properties,
    }
}

fn parse_vehicle_category(token: &str) -> VehicleCategory {
    match token {
        "car" | "" => VehicleCategory::Car,
        "van" => VehicleCategory::Van,
        "truck" => VehicleCategory::Truck,
        "trailer" => VehicleCategory::Trailer,
        "semitrailer" => VehicleCategory::Semitrailer,
        "bus" => VehicleCategory::Bus,
        "motorbike" => VehicleCategory::Motorbike,
        "bicycle" => VehicleCategory::Bicycle,
        "train" => VehicleCategory::Train,
        "tram" => VehicleCategory::Tram,
        other => {
            warn!(category = other, "unknown vehicle category");
            VehicleCategory::Other
        }
    }
}

/// Parse a `Route` element. Returns `None` for a route with no waypoints.
pub(crate) fn parse_route_node(
    node: &Node<'_, '_>,
    params: &ParameterTable,
    entities: &EntityPool,
) -> Option<RouteSpec> {
    let name = attr(params, node, "name");
    debug!(route = name, "parsing route");
    let closed = parse_bool(&attr(params, node, "closed"), "closed");

    let mut waypoints = Vec::new();
    for route_child in node.children().filter(Node::is_element) {
        match route_child.tag_name().name() {
            "ParameterDeclaration" => {
                warn!("route-level parameter declarations are not supported");
            }
            "Waypoint" => {
                if let Some(position) = route_child
                    .children()
                    .find(|n| n.has_tag_name("Position"))
                    .and_then(|p| parse_position(&p, params, entities, None))
                {
                    waypoints.push(position);
                }
            }
            other => warn!(element = other, "unexpected route child"),
        }
    }

    if waypoints.is_empty() {
        warn!(route = name, "route has no usable waypoints, dropping");
        return None;
    }
    Some(RouteSpec {
        name,
        closed,
        waypoints,
    })
}

fn parse_orientation(node: &Node<'_, '_>, params: &ParameterTable) -> Orientation {
    let kind = match attr(params, node, "type").as_str() {
        "relative" => OrientationKind::Relative,
        "absolute" | "" => OrientationKind::Absolute,
        other => {
            warn!(orientation = other, "invalid orientation type, treating as absolute");
            OrientationKind::Absolute
        }
    };
    Orientation {
        kind,
        h: attr_f64(params, node, "h"),
        p: attr_f64(params, node, "p"),
        r: attr_f64(params, node, "r"),
    }
}

/// Parse a `Position` element into one of the coordinate flavors.
///
/// `catalogs` is needed only for route-flavored positions; waypoints
/// inside catalog routes pass `None` and warn on nested route positions.
pub(crate) fn parse_position(
    node: &Node<'_, '_>,
    params: &ParameterTable,
    entities: &EntityPool,
    mut catalogs: Option<&mut CatalogSet>,
) -> Option<PositionSpec> {
    for pos_child in node.children().filter(Node::is_element) {
        match pos_child.tag_name().name() {
            "World" => {
                return Some(PositionSpec::World {
                    x: attr_f64(params, &pos_child, "x"),
                    y: attr_f64(params, &pos_child, "y"),
                    z: attr_f64(params, &pos_child, "z"),
                    h: attr_f64(params, &pos_child, "h"),
                    p: attr_f64(params, &pos_child, "p"),
                    r: attr_f64(params, &pos_child, "r"),
                });
            }
            "Lane" => {
                return Some(PositionSpec::Lane {
                    road_id: attr_i32(params, &pos_child, "roadId"),
                    lane_id: attr_i32(params, &pos_child, "laneId"),
                    s: attr_f64(params, &pos_child, "s"),
                    offset: attr_f64(params, &pos_child, "offset"),
                    orientation: child(&pos_child, "Orientation")
                        .map(|o| parse_orientation(&o, params)),
                });
            }
            "RelativeObject" => {
                let entity = resolve_entity(params, &pos_child, "object", entities)?;
                return Some(PositionSpec::RelativeObject {
                    entity,
                    dx: attr_f64(params, &pos_child, "dx"),
                    dy: attr_f64(params, &pos_child, "dy"),
                    dz: attr_f64(params, &pos_child, "dz"),
                    orientation: child(&pos_child, "Orientation")
                        .map(|o| parse_orientation(&o, params)),
                });
            }
            "RelativeLane" => {
                let entity = resolve_entity(params, &pos_child, "object", entities)?;
                return Some(PositionSpec::RelativeLane {
                    entity,
                    d_lane: attr_i32(params, &pos_child, "dLane"),
                    ds: attr_f64(params, &pos_child, "ds"),
                    offset: attr_f64(params, &pos_child, "offset"),
                    orientation: child(&pos_child, "Orientation")
                        .map(|o| parse_orientation(&o, params)),
                });
            }
            "Route" => {
                return parse_route_position(&pos_child, params, entities, catalogs.as_deref_mut());
            }
            other => {
                warn!(position = other, "position flavor not supported, dropping");
                return None;
            }
        }
    }
    warn!("empty Position element");
    None
}

fn parse_route_position(
    node: &Node<'_, '_>,
    params: &ParameterTable,
    entities: &EntityPool,
    catalogs: Option<&mut CatalogSet>,
) -> Option<PositionSpec> {
    let Some(catalogs) = catalogs else {
        warn!("route position not supported here, dropping");
        return None;
    };

    let mut route = None;
    let mut lane_id = 0;
    let mut path_s = 0.0;
    let mut lane_offset = 0.0;

    for route_child in node.children().filter(Node::is_element) {
        match route_child.tag_name().name() {
            "RouteRef" => {
                for ref_child in route_child.children().filter(Node::is_element) {
                    match ref_child.tag_name().name() {
                        "Route" => {
                            warn!("inline route references are not supported, use a catalog");
                        }
                        "CatalogReference" => {
                            route = lookup_route(&ref_child, params, entities, catalogs);
                        }
                        other => warn!(element = other, "unexpected RouteRef child"),
                    }
                }
            }
            "Orientation" => warn!("route position orientation is not supported"),
            "Position" => {
                for coord in route_child.children().filter(Node::is_element) {
                    match coord.tag_name().name() {
                        "LaneCoord" => {
                            path_s = attr_f64(params, &coord, "pathS");
                            lane_id = attr_i32(params, &coord, "laneId");
                            lane_offset = attr_f64(params, &coord, "laneOffset");
                        }
                        other => warn!(coordinate = other, "route coordinate not supported"),
                    }
                }
            }
            other => warn!(element = other, "unexpected route position child"),
        }
    }

    route.map(|route| PositionSpec::Route {
        route,
        lane_id,
        path_s,
        lane_offset,
    })
}

/// Resolve a route catalog reference into a cloned route.
fn lookup_route(
    reference: &Node<'_, '_>,
    params: &ParameterTable,
    entities: &EntityPool,
    catalogs: &mut CatalogSet,
) -> Option<RouteSpec> {
    let catalog_name = attr(params, reference, "catalogName");
    let entry_name = attr(params, reference, "entryName");
    let entry = catalogs.find_entry(
        CatalogKind::Route,
        &catalog_name,
        &entry_name,
        params,
        entities,
    )?;
    match entry.payload {
        CatalogPayload::Route(route) => Some(route),
        other => {
            warn!(
                catalog = catalog_name,
                entry = entry_name,
                kind = %other.kind(),
                "catalog entry is not a route"
            );
            None
        }
    }
}

/// Resolve an entity-name attribute against the pool; `None` drops the
/// referencing element.
fn resolve_entity(
    params: &ParameterTable,
    node: &Node<'_, '_>,
    attribute: &str,
    entities: &EntityPool,
) -> Option<EntityId> {
    let name = attr(params, node, attribute);
    let id = entities.id_of(&name);
    if id.is_none() {
        warn!(entity = name, "failed to find entity, dropping element");
    }
    id
}

fn parse_entities(
    node: &Node<'_, '_>,
    params: &ParameterTable,
    catalogs: &mut CatalogSet,
    entities: &mut EntityPool,
) {
    for object_node in node.children().filter(|n| n.has_tag_name("Object")) {
        let name = attr(params, &object_node, "name");
        if entities.by_name(&name).is_some() {
            warn!(entity = name, "duplicate entity name, skipping object");
            continue;
        }

        let mut vehicle = None;
        for object_child in object_node.children().filter(Node::is_element) {
            match object_child.tag_name().name() {
                "CatalogReference" => {
                    let catalog_name = attr(params, &object_child, "catalogName");
                    let entry_name = attr(params, &object_child, "entryName");
                    match catalogs
                        .find_entry(
                            CatalogKind::Vehicle,
                            &catalog_name,
                            &entry_name,
                            params,
                            entities,
                        )
                        .map(|e| e.payload)
                    {
                        // Deep clone: the instantiated entity shares
                        // nothing with the catalog template.
                        Some(CatalogPayload::Vehicle(spec)) => vehicle = Some(spec),
                        Some(other) => warn!(
                            entry = entry_name,
                            kind = %other.kind(),
                            "catalog entry is not a vehicle"
                        ),
                        None => {}
                    }
                }
                "Vehicle" => vehicle = Some(parse_vehicle_node(&object_child, params)),
                other => warn!(element = other, "entity definition not supported"),
            }
        }

        if let Some(vehicle) = vehicle {
            let id = entities.add(name.clone(), vehicle);
            debug!(entity = name, %id, "entity added");
        } else {
            warn!(entity = name, "object has no usable definition, skipping");
        }
    }
}

/// Apply the load-time external-control override to the first entity.
fn apply_control_override(control: ControlOverride, entities: &mut EntityPool) {
    let external = match control {
        ControlOverride::ByScenario => return,
        ControlOverride::ForceOff => false,
        ControlOverride::ForceOn => true,
    };
    let first = entities.iter().next().map(|e| (e.id, e.name.clone()));
    if let Some((id, name)) = first {
        info!(entity = name, external, "external-control override applied");
        entities.set_external(id, external);
    }
}

fn parse_init(
    storyboard: &Node<'_, '_>,
    params: &ParameterTable,
    entities: &EntityPool,
    catalogs: &mut CatalogSet,
) -> Vec<ActionSpec> {
    let mut actions = Vec::new();
    let Some(actions_node) = child(storyboard, "Init").and_then(|init| child(&init, "Actions"))
    else {
        return actions;
    };

    for actions_child in actions_node.children().filter(Node::is_element) {
        match actions_child.tag_name().name() {
            "Global" | "UserDefined" => {
                warn!(action = actions_child.tag_name().name(), "init action kind not supported");
            }
            "Private" => {
                let Some(entity) = resolve_entity(params, &actions_child, "object", entities)
                else {
                    continue;
                };
                let entity_name = entities
                    .by_id(entity)
                    .map(|e| e.name.clone())
                    .unwrap_or_default();
                for private_child in actions_child.children().filter(Node::is_element) {
                    let kind_name = private_child.tag_name().name().to_owned();
                    if let Some(kind) =
                        parse_private_action(&private_child, params, entities, catalogs)
                    {
                        actions.push(ActionSpec {
                            name: format!("Init {entity_name} {kind_name}"),
                            entity,
                            kind,
                        });
                    }
                }
            }
            other => warn!(element = other, "unexpected init child"),
        }
    }
    actions
}

/// Parse one private-action element (the `Longitudinal`/`Lateral`/...
/// node itself) into an [`ActionKind`].
#[allow(clippy::too_many_lines)]
fn parse_private_action(
    node: &Node<'_, '_>,
    params: &ParameterTable,
    entities: &EntityPool,
    catalogs: &mut CatalogSet,
) -> Option<ActionKind> {
    match node.tag_name().name() {
        "Longitudinal" => {
            for action_child in node.children().filter(Node::is_element) {
                match action_child.tag_name().name() {
                    "Speed" => return parse_speed_action(&action_child, params, entities),
                    "Distance" => return parse_distance_action(&action_child, params, entities),
                    other => warn!(element = other, "longitudinal action not supported"),
                }
            }
            None
        }
        "Lateral" => {
            for action_child in node.children().filter(Node::is_element) {
                match action_child.tag_name().name() {
                    "LaneChange" => {
                        return parse_lane_change_action(&action_child, params, entities);
                    }
                    "LaneOffset" => {
                        return parse_lane_offset_action(&action_child, params, entities);
                    }
                    other => warn!(element = other, "lateral action not supported"),
                }
            }
            None
        }
        "Meeting" => parse_meeting_action(node, params, entities, catalogs),
        "Position" => {
            parse_position(node, params, entities, Some(catalogs)).map(ActionKind::Position)
        }
        "Routing" => {
            for routing_child in node.children().filter(|n| n.has_tag_name("FollowRoute")) {
                for follow_child in routing_child.children().filter(Node::is_element) {
                    match follow_child.tag_name().name() {
                        "Route" => warn!("inline follow-route is not supported, use a catalog"),
                        "CatalogReference" => {
                            if let Some(route) =
                                lookup_route(&follow_child, params, entities, catalogs)
                            {
                                return Some(ActionKind::FollowRoute { route });
                            }
                        }
                        other => warn!(element = other, "unexpected FollowRoute child"),
                    }
                }
            }
            None
        }
        "Autonomous" => {
            let activate = attr_bool(params, node, "activate");
            let domain = match attr(params, node, "domain").as_str() {
                "longitudinal" => ControlDomain::Longitudinal,
                "lateral" => ControlDomain::Lateral,
                "both" | "" => ControlDomain::Both,
                other => {
                    warn!(domain = other, "invalid autonomous domain, defaulting to both");
                    ControlDomain::Both
                }
            };
            Some(ActionKind::Autonomous { activate, domain })
        }
        other => {
            warn!(action = other, "action kind not supported");
            None
        }
    }
}

/// Dynamics attributes shared by speed and lane-change actions: shape
/// plus at most one of `rate`/`time`/`distance`.
fn parse_transition_dynamics(node: &Node<'_, '_>, params: &ParameterTable) -> TransitionDynamics {
    let shape = parse_dynamics_shape(&attr(params, node, "shape"));
    let mut timing = None;
    for (name, kind) in [
        ("rate", TimingKind::Rate),
        ("time", TimingKind::Time),
        ("distance", TimingKind::Distance),
    ] {
        if node.attribute(name).is_some() {
            timing = Some(Timing {
                kind,
                value: attr_f64(params, node, name),
            });
        }
    }
    TransitionDynamics { shape, timing }
}

fn parse_dynamics_shape(token: &str) -> DynamicsShape {
    match token {
        "linear" => DynamicsShape::Linear,
        "sinusoidal" => DynamicsShape::Sinusoidal,
        "step" => DynamicsShape::Step,
        other => {
            // Rejected at execution, not at parse: a template may carry
            // shapes its users never exercise.
            warn!(shape = other, "dynamics shape not recognized");
            DynamicsShape::Undefined
        }
    }
}

fn parse_speed_action(
    node: &Node<'_, '_>,
    params: &ParameterTable,
    entities: &EntityPool,
) -> Option<ActionKind> {
    let mut dynamics = TransitionDynamics {
        shape: DynamicsShape::Step,
        timing: None,
    };
    let mut target = None;

    for speed_child in node.children().filter(Node::is_element) {
        match speed_child.tag_name().name() {
            "Dynamics" => dynamics = parse_transition_dynamics(&speed_child, params),
            "Target" => {
                for target_child in speed_child.children().filter(Node::is_element) {
                    match target_child.tag_name().name() {
                        "Absolute" => {
                            target = Some(SpeedTarget::Absolute {
                                value: attr_f64(params, &target_child, "value"),
                            });
                        }
                        "Relative" => {
                            let entity =
                                resolve_entity(params, &target_child, "object", entities)?;
                            let kind = match attr(params, &target_child, "valueType").as_str() {
                                "delta" => SpeedTargetKind::Delta,
                                "factor" => SpeedTargetKind::Factor,
                                "" => {
                                    warn!("speed target value type missing, falling back to delta");
                                    SpeedTargetKind::Delta
                                }
                                other => {
                                    warn!(value_type = other, "invalid speed target value type");
                                    SpeedTargetKind::Delta
                                }
                            };
                            target = Some(SpeedTarget::Relative {
                                entity,
                                value: attr_f64(params, &target_child, "value"),
                                kind,
                                continuous: attr_bool(params, &target_child, "continuous"),
                            });
                        }
                        other => warn!(element = other, "unexpected speed target"),
                    }
                }
            }
            other => warn!(element = other, "unexpected speed action child"),
        }
    }

    target.map(|target| ActionKind::Speed { dynamics, target })
}

fn parse_distance_action(
    node: &Node<'_, '_>,
    params: &ParameterTable,
    entities: &EntityPool,
) -> Option<ActionKind> {
    let entity = resolve_entity(params, node, "object", entities)?;

    let mut limits = None;
    match child(node, "Dynamics") {
        Some(dynamics_node) => {
            if child(&dynamics_node, "None").is_some() {
                // Unlimited: required speed applied directly each tick.
            } else if let Some(limited) = child(&dynamics_node, "Limited") {
                limits = Some(DynamicLimits {
                    max_acceleration: Some(attr_f64(params, &limited, "maxAcceleration")),
                    max_deceleration: Some(attr_f64(params, &limited, "maxDeceleration")),
                    max_speed: Some(attr_f64(params, &limited, "maxSpeed")),
                });
            } else {
                warn!("distance action Dynamics lacks None or Limited child");
            }
        }
        None => warn!("distance action lacks a Dynamics child"),
    }

    let gap = if node.attribute("distance").is_some() {
        DistanceGap::Space {
            meters: attr_f64(params, node, "distance"),
        }
    } else if node.attribute("timeGap").is_some() {
        DistanceGap::Time {
            seconds: attr_f64(params, node, "timeGap"),
        }
    } else {
        warn!("distance action needs a distance or timeGap attribute, dropping");
        return None;
    };

    Some(ActionKind::Distance {
        entity,
        gap,
        freespace: attr_bool(params, node, "freespace"),
        limits,
    })
}

fn parse_lane_change_action(
    node: &Node<'_, '_>,
    params: &ParameterTable,
    entities: &EntityPool,
) -> Option<ActionKind> {
    let target_lane_offset = attr_f64(params, node, "targetLaneOffset");
    let mut dynamics = TransitionDynamics {
        shape: DynamicsShape::Step,
        timing: None,
    };
    let mut target = None;

    for lane_child in node.children().filter(Node::is_element) {
        match lane_child.tag_name().name() {
            "Dynamics" => dynamics = parse_transition_dynamics(&lane_child, params),
            "Target" => {
                for target_child in lane_child.children().filter(Node::is_element) {
                    match target_child.tag_name().name() {
                        "Absolute" => {
                            target = Some(LaneChangeTarget::Absolute {
                                lane_id: attr_i32(params, &target_child, "value"),
                            });
                        }
                        "Relative" => {
                            let entity =
                                resolve_entity(params, &target_child, "object", entities)?;
                            target = Some(LaneChangeTarget::Relative {
                                entity,
                                delta: attr_i32(params, &target_child, "value"),
                            });
                        }
                        other => warn!(element = other, "unexpected lane-change target"),
                    }
                }
            }
            other => warn!(element = other, "unexpected lane-change child"),
        }
    }

    target.map(|target| ActionKind::LaneChange {
        dynamics,
        target_lane_offset,
        target,
    })
}

fn parse_lane_offset_action(
    node: &Node<'_, '_>,
    params: &ParameterTable,
    entities: &EntityPool,
) -> Option<ActionKind> {
    let mut shape = DynamicsShape::Step;
    let mut max_lateral_acc = 0.0;
    let mut duration = None;
    let mut target = None;

    for offset_child in node.children().filter(Node::is_element) {
        match offset_child.tag_name().name() {
            "Dynamics" => {
                shape = parse_dynamics_shape(&attr(params, &offset_child, "shape"));
                max_lateral_acc = attr_f64(params, &offset_child, "maxLateralAcc");
                if offset_child.attribute("duration").is_some() {
                    duration = Some(attr_f64(params, &offset_child, "duration"));
                }
            }
            "Target" => {
                for target_child in offset_child.children().filter(Node::is_element) {
                    match target_child.tag_name().name() {
                        "Absolute" => {
                            target = Some(LaneOffsetTarget::Absolute {
                                offset: attr_f64(params, &target_child, "value"),
                            });
                        }
                        "Relative" => {
                            let entity =
                                resolve_entity(params, &target_child, "object", entities)?;
                            target = Some(LaneOffsetTarget::Relative {
                                entity,
                                offset: attr_f64(params, &target_child, "value"),
                            });
                        }
                        other => warn!(element = other, "unexpected lane-offset target"),
                    }
                }
            }
            other => warn!(element = other, "unexpected lane-offset child"),
        }
    }

    target.map(|target| ActionKind::LaneOffset {
        shape,
        max_lateral_acc,
        duration,
        target,
    })
}

fn parse_meeting_action(
    node: &Node<'_, '_>,
    params: &ParameterTable,
    entities: &EntityPool,
    catalogs: &mut CatalogSet,
) -> Option<ActionKind> {
    let position = child(node, "Position")
        .and_then(|p| parse_position(&p, params, entities, Some(catalogs)));

    if let Some(rel) = child(node, "Relative") {
        let position = position?;
        let mode = match attr(params, &rel, "mode").as_str() {
            "straight" | "" => MeetingMode::Straight,
            "route" => MeetingMode::Route,
            other => {
                warn!(mode = other, "invalid meeting mode, defaulting to straight");
                MeetingMode::Straight
            }
        };
        let entity = resolve_entity(params, &rel, "object", entities)?;
        let entity_position = child(&rel, "Position")
            .and_then(|p| parse_position(&p, params, entities, Some(catalogs)))?;
        return Some(ActionKind::MeetingRelative {
            position,
            entity,
            entity_position,
            mode,
            offset_time: attr_f64(params, &rel, "offsetTime"),
            continuous: attr_bool(params, &rel, "continuous"),
        });
    }

    if let Some(abs) = child(node, "Absolute") {
        let position = position?;
        return Some(ActionKind::MeetingAbsolute {
            position,
            time_to_destination: attr_f64(params, &abs, "TimeToDestination"),
        });
    }

    warn!("meeting action lacks a Relative or Absolute child, dropping");
    None
}

fn parse_rule(token: &str) -> Rule {
    match token {
        "greater_than" => Rule::GreaterThan,
        "less_than" => Rule::LessThan,
        "equal_to" => Rule::EqualTo,
        other => {
            warn!(rule = other, "invalid comparison rule");
            Rule::Undefined
        }
    }
}

fn parse_condition_edge(token: &str) -> ConditionEdge {
    match token {
        "rising" => ConditionEdge::Rising,
        "falling" => ConditionEdge::Falling,
        "any" => ConditionEdge::Any,
        "" => ConditionEdge::None,
        other => {
            warn!(edge = other, "unsupported condition edge, treating as absent");
            ConditionEdge::None
        }
    }
}

fn parse_element_kind(token: &str) -> StoryElementKind {
    match token {
        "act" => StoryElementKind::Act,
        "scene" => StoryElementKind::Scene,
        "maneuver" => StoryElementKind::Maneuver,
        "event" => StoryElementKind::Event,
        "action" => StoryElementKind::Action,
        other => {
            warn!(element_type = other, "invalid story element type");
            StoryElementKind::Undefined
        }
    }
}

/// Parse the `TriggeringEntities` element of a by-entity condition.
fn parse_triggering_entities(
    condition_node: &Node<'_, '_>,
    params: &ParameterTable,
    entities: &EntityPool,
) -> Option<TriggeringEntities> {
    let node = child(condition_node, "TriggeringEntities")?;
    let rule = match attr(params, &node, "rule").as_str() {
        "all" => TriggerRule::All,
        "any" | "" => TriggerRule::Any,
        other => {
            warn!(rule = other, "invalid triggering-entities rule, defaulting to any");
            TriggerRule::Any
        }
    };
    let mut members = Vec::new();
    for entity_node in node.children().filter(|n| n.has_tag_name("Entity")) {
        members.push(resolve_entity(params, &entity_node, "name", entities)?);
    }
    Some(TriggeringEntities { rule, members })
}

/// Parse one `Condition` element; `None` drops it with a diagnostic.
#[allow(clippy::too_many_lines)]
fn parse_condition(
    node: &Node<'_, '_>,
    params: &ParameterTable,
    entities: &EntityPool,
    catalogs: &mut CatalogSet,
) -> Option<Condition> {
    let name = attr(params, node, "name");
    debug!(condition = name, "parsing condition");

    let mut kind = None;
    for condition_child in node.children().filter(Node::is_element) {
        match condition_child.tag_name().name() {
            "ByEntity" => {
                let Some(triggering) =
                    parse_triggering_entities(&condition_child, params, entities)
                else {
                    warn!(condition = name, "by-entity condition lacks triggering entities");
                    return None;
                };
                let entity_condition = child(&condition_child, "EntityCondition")?;
                for test_node in entity_condition.children().filter(Node::is_element) {
                    kind = parse_entity_condition(
                        &test_node,
                        triggering.clone(),
                        params,
                        entities,
                        catalogs,
                    );
                }
            }
            "ByState" => {
                for state_child in condition_child.children().filter(Node::is_element) {
                    match state_child.tag_name().name() {
                        "AtStart" => {
                            kind = Some(ConditionKind::AtStart {
                                element: parse_element_kind(&attr(params, &state_child, "type")),
                                name: attr(params, &state_child, "name"),
                            });
                        }
                        "AfterTermination" => {
                            let rule = match attr(params, &state_child, "rule").as_str() {
                                "end" => TerminationRule::End,
                                "cancel" => TerminationRule::Cancel,
                                "any" | "" => TerminationRule::Any,
                                other => {
                                    warn!(rule = other, "invalid termination rule, defaulting to any");
                                    TerminationRule::Any
                                }
                            };
                            kind = Some(ConditionKind::AfterTermination {
                                element: parse_element_kind(&attr(params, &state_child, "type")),
                                name: attr(params, &state_child, "name"),
                                rule,
                            });
                        }
                        other => warn!(state = other, "by-state condition not supported"),
                    }
                }
            }
            "ByValue" => {
                for value_child in condition_child.children().filter(Node::is_element) {
                    match value_child.tag_name().name() {
                        "SimulationTime" => {
                            kind = Some(ConditionKind::SimulationTime {
                                value: attr_f64(params, &value_child, "value"),
                                rule: parse_rule(&attr(params, &value_child, "rule")),
                            });
                        }
                        other => warn!(value = other, "by-value condition not supported"),
                    }
                }
            }
            other => warn!(condition = other, "condition category not supported"),
        }
    }

    let kind = kind?;
    let mut delay = attr_f64(params, node, "delay");
    if delay < 0.0 {
        warn!(condition = name, delay, "negative delay clamped to 0");
        delay = 0.0;
    }

    Some(Condition {
        name,
        delay,
        edge: parse_condition_edge(&attr(params, node, "edge")),
        kind,
    })
}

fn parse_entity_condition(
    node: &Node<'_, '_>,
    triggering: TriggeringEntities,
    params: &ParameterTable,
    entities: &EntityPool,
    catalogs: &mut CatalogSet,
) -> Option<ConditionKind> {
    match node.tag_name().name() {
        "TimeHeadway" => Some(ConditionKind::TimeHeadway {
            triggering,
            entity: resolve_entity(params, node, "entity", entities)?,
            value: attr_f64(params, node, "value"),
            rule: parse_rule(&attr(params, node, "rule")),
            freespace: attr_bool(params, node, "freespace"),
            along_route: attr_bool(params, node, "alongRoute"),
        }),
        "ReachPosition" => {
            if node.attribute("tolerance").is_none() {
                warn!("reach-position condition requires a tolerance");
            }
            Some(ConditionKind::ReachPosition {
                triggering,
                position: child(node, "Position")
                    .and_then(|p| parse_position(&p, params, entities, Some(catalogs)))?,
                tolerance: attr_f64(params, node, "tolerance"),
            })
        }
        "RelativeDistance" => {
            let kind = match attr(params, node, "type").to_lowercase().as_str() {
                "longitudinal" => RelativeDistanceKind::Longitudinal,
                "lateral" => RelativeDistanceKind::Lateral,
                "inertial" => RelativeDistanceKind::Inertial,
                other => {
                    warn!(distance_type = other, "unknown relative-distance type, dropping");
                    return None;
                }
            };
            Some(ConditionKind::RelativeDistance {
                triggering,
                entity: resolve_entity(params, node, "entity", entities)?,
                kind,
                value: attr_f64(params, node, "value"),
                rule: parse_rule(&attr(params, node, "rule")),
                freespace: attr_bool(params, node, "freespace"),
            })
        }
        "Distance" => {
            let along_route = attr_bool(params, node, "alongRoute");
            if along_route {
                warn!("distance along route is not supported, falling back to straight-line");
            }
            Some(ConditionKind::Distance {
                triggering,
                position: child(node, "Position")
                    .and_then(|p| parse_position(&p, params, entities, Some(catalogs)))?,
                value: attr_f64(params, node, "value"),
                rule: parse_rule(&attr(params, node, "rule")),
                freespace: attr_bool(params, node, "freespace"),
                along_route: false,
            })
        }
        other => {
            warn!(condition = other, "entity condition not supported");
            None
        }
    }
}

/// Parse the `ConditionGroup` list under a `Start`/`End`/`StartConditions`
/// node. Groups OR, conditions within a group AND.
fn parse_condition_groups(
    parent: &Node<'_, '_>,
    params: &ParameterTable,
    entities: &EntityPool,
    catalogs: &mut CatalogSet,
) -> Vec<ConditionGroup> {
    let mut groups = Vec::new();
    for group_node in parent.children().filter(Node::is_element) {
        let mut group = Vec::new();
        for condition_node in group_node.children().filter(Node::is_element) {
            if let Some(condition) = parse_condition(&condition_node, params, entities, catalogs) {
                group.push(condition);
            }
        }
        groups.push(group);
    }
    groups
}

/// Parse a `Maneuver` element, instantiating one action per declared
/// action per sequence actor.
fn parse_maneuver(
    node: &Node<'_, '_>,
    actors: &[EntityId],
    params: &ParameterTable,
    entities: &EntityPool,
    catalogs: &mut CatalogSet,
) -> Maneuver {
    let name = attr(params, node, "name");
    debug!(maneuver = name, "parsing maneuver");

    let mut events = Vec::new();
    for maneuver_child in node.children().filter(Node::is_element) {
        match maneuver_child.tag_name().name() {
            "ParameterDeclaration" => {
                warn!("maneuver-level parameter declarations are not supported");
            }
            "Event" => {
                events.push(parse_event(&maneuver_child, actors, params, entities, catalogs));
            }
            other => warn!(element = other, "unexpected maneuver child"),
        }
    }

    Maneuver { name, events }
}

fn parse_event(
    node: &Node<'_, '_>,
    actors: &[EntityId],
    params: &ParameterTable,
    entities: &EntityPool,
    catalogs: &mut CatalogSet,
) -> Event {
    let name = attr(params, node, "name");
    debug!(event = name, "parsing event");

    let priority = match attr(params, node, "priority").as_str() {
        "overwrite" => EventPriority::Overwrite,
        "following" => EventPriority::Following,
        "skip" => EventPriority::Skip,
        other => {
            warn!(event = name, priority = other, "invalid priority, defaulting to overwrite");
            EventPriority::Overwrite
        }
    };

    let mut actions = Vec::new();
    let mut start_groups = Vec::new();
    for event_child in node.children().filter(Node::is_element) {
        match event_child.tag_name().name() {
            "Action" => {
                let action_name = attr(params, &event_child, "name");
                for action_child in event_child.children().filter(Node::is_element) {
                    match action_child.tag_name().name() {
                        "Global" | "UserDefined" => {
                            warn!(
                                action = action_child.tag_name().name(),
                                "event action kind not supported"
                            );
                        }
                        "Private" => {
                            for private_child in action_child.children().filter(Node::is_element)
                            {
                                for &actor in actors {
                                    if let Some(kind) = parse_private_action(
                                        &private_child,
                                        params,
                                        entities,
                                        catalogs,
                                    ) {
                                        actions.push(ActionSpec {
                                            name: action_name.clone(),
                                            entity: actor,
                                            kind,
                                        });
                                    }
                                }
                            }
                        }
                        other => warn!(element = other, "unexpected action child"),
                    }
                }
            }
            "StartConditions" => {
                start_groups = parse_condition_groups(&event_child, params, entities, catalogs);
            }
            other => warn!(element = other, "unexpected event child"),
        }
    }

    Event {
        name,
        priority,
        actions,
        start_groups,
    }
}

fn parse_story(
    node: &Node<'_, '_>,
    params: &mut ParameterTable,
    entities: &EntityPool,
    catalogs: &mut CatalogSet,
) -> Story {
    let name = attr(params, node, "name");
    let owner = attr(params, node, "owner");
    info!(story = name, owner, "parsing story");

    // The story owner is visible to nested attributes as `$owner`.
    params.add("$owner", "string", &owner);

    let mut acts = Vec::new();
    for act_node in node.children().filter(|n| n.has_tag_name("Act")) {
        acts.push(parse_act(&act_node, params, entities, catalogs));
    }

    Story { name, owner, acts }
}

fn parse_act(
    node: &Node<'_, '_>,
    params: &ParameterTable,
    entities: &EntityPool,
    catalogs: &mut CatalogSet,
) -> Act {
    let name = attr(params, node, "name");
    debug!(act = name, "parsing act");

    let mut sequences = Vec::new();
    let mut start_groups = Vec::new();
    let mut end_groups = Vec::new();

    for act_child in node.children().filter(Node::is_element) {
        match act_child.tag_name().name() {
            "Sequence" => sequences.push(parse_sequence(&act_child, params, entities, catalogs)),
            "Conditions" => {
                for conditions_child in act_child.children().filter(Node::is_element) {
                    match conditions_child.tag_name().name() {
                        "Start" => {
                            start_groups = parse_condition_groups(
                                &conditions_child,
                                params,
                                entities,
                                catalogs,
                            );
                        }
                        "End" => {
                            end_groups = parse_condition_groups(
                                &conditions_child,
                                params,
                                entities,
                                catalogs,
                            );
                        }
                        "Cancel" => warn!("act cancel conditions are not supported"),
                        other => warn!(element = other, "unexpected conditions child"),
                    }
                }
            }
            other => warn!(element = other, "unexpected act child"),
        }
    }

    Act {
        name,
        sequences,
        start_groups,
        end_groups,
    }
}

fn parse_sequence(
    node: &Node<'_, '_>,
    params: &ParameterTable,
    entities: &EntityPool,
    catalogs: &mut CatalogSet,
) -> Sequence {
    let name = attr(params, node, "name");
    let repetitions = attr(params, node, "numberOfExecutions")
        .parse::<u32>()
        .unwrap_or(1)
        .max(1);

    let mut actors = Vec::new();
    if let Some(actors_node) = child(node, "Actors") {
        for actor_node in actors_node.children().filter(Node::is_element) {
            match actor_node.tag_name().name() {
                "Entity" => {
                    if let Some(id) = resolve_entity(params, &actor_node, "name", entities) {
                        actors.push(id);
                    }
                }
                "ByCondition" => warn!("actor selection by condition is not supported"),
                other => warn!(element = other, "unexpected actors child"),
            }
        }
    }

    let mut maneuvers = Vec::new();

    // Maneuver catalog references: the stored template is re-parsed per
    // referencing sequence so each expansion binds its own actors.
    for reference in node.children().filter(|n| n.has_tag_name("CatalogReference")) {
        let catalog_name = attr(params, &reference, "catalogName");
        let entry_name = attr(params, &reference, "entryName");
        let Some(entry) = catalogs.find_entry(
            CatalogKind::Maneuver,
            &catalog_name,
            &entry_name,
            params,
            entities,
        ) else {
            continue;
        };
        match entry.payload {
            CatalogPayload::ManeuverXml(xml) => match roxmltree::Document::parse(&xml) {
                Ok(template) => {
                    let template_root = template.root_element();
                    maneuvers.push(parse_maneuver(
                        &template_root,
                        &actors,
                        params,
                        entities,
                        catalogs,
                    ));
                }
                Err(error) => {
                    warn!(entry = entry_name, %error, "maneuver template failed to parse");
                }
            },
            other => warn!(
                entry = entry_name,
                kind = %other.kind(),
                "catalog entry is not a maneuver"
            ),
        }
    }

    for maneuver_node in node.children().filter(|n| n.has_tag_name("Maneuver")) {
        maneuvers.push(parse_maneuver(&maneuver_node, &actors, params, entities, catalogs));
    }

    Sequence {
        name,
        actors,
        repetitions,
        maneuvers,
    }
}
