//! Integration tests for scenario document loading.
//!
//! Documents are built inline; catalog tests write their files into a
//! scratch directory so relative-path resolution is exercised for real.

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::too_many_lines,
    clippy::indexing_slicing,
    clippy::float_cmp
)]

use std::path::Path;

use roadshow_reader::{ReaderError, load, load_str};
use roadshow_types::{
    ActionKind, ConditionEdge, ConditionKind, ControlOverride, DynamicsShape, EventPriority, Rule,
    SpeedTarget, StoryElementKind, TerminationRule, TimingKind, TriggerRule,
};

/// Wrap storyboard-level body fragments in a minimal valid document.
fn scenario(extra: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<OpenSCENARIO>
  <FileHeader description="test scenario"/>
  <ParameterDeclaration>
    <Parameter name="$EgoSpeed" type="double" value="30"/>
    <Parameter name="$TargetVehicle" type="string" value="car_red"/>
  </ParameterDeclaration>
  <RoadNetwork>
    <Logics filepath="road.xodr"/>
    <SceneGraph filepath="scene.osgb"/>
  </RoadNetwork>
  <Entities>
    <Object name="Ego">
      <Vehicle name="car_white" category="car">
        <Properties>
          <Property name="model_id" value="0"/>
        </Properties>
      </Vehicle>
    </Object>
    <Object name="Target">
      <Vehicle name="$TargetVehicle" category="car">
        <Properties>
          <Property name="model_id" value="2"/>
        </Properties>
      </Vehicle>
    </Object>
  </Entities>
  {extra}
</OpenSCENARIO>"#
    )
}

const STORYBOARD: &str = r#"<Storyboard>
    <Init>
      <Actions>
        <Private object="Ego">
          <Position>
            <Lane roadId="1" laneId="-1" s="10" offset="0"/>
          </Position>
          <Longitudinal>
            <Speed>
              <Dynamics shape="step"/>
              <Target>
                <Absolute value="$EgoSpeed"/>
              </Target>
            </Speed>
          </Longitudinal>
        </Private>
      </Actions>
    </Init>
    <Story name="story" owner="Target">
      <Act name="act">
        <Sequence name="seq" numberOfExecutions="2">
          <Actors>
            <Entity name="$owner"/>
          </Actors>
          <Maneuver name="brake">
            <Event name="slowdown" priority="overwrite">
              <Action name="slow">
                <Private>
                  <Longitudinal>
                    <Speed>
                      <Dynamics shape="sinusoidal" time="3"/>
                      <Target>
                        <Absolute value="10"/>
                      </Target>
                    </Speed>
                  </Longitudinal>
                </Private>
              </Action>
              <StartConditions>
                <ConditionGroup>
                  <Condition name="headway" delay="0.5" edge="rising">
                    <ByEntity>
                      <TriggeringEntities rule="any">
                        <Entity name="Ego"/>
                      </TriggeringEntities>
                      <EntityCondition>
                        <TimeHeadway entity="Target" value="1.5" freespace="true"
                                     alongRoute="false" rule="less_than"/>
                      </EntityCondition>
                    </ByEntity>
                  </Condition>
                </ConditionGroup>
              </StartConditions>
            </Event>
          </Maneuver>
        </Sequence>
        <Conditions>
          <Start>
            <ConditionGroup>
              <Condition name="kickoff" delay="0" edge="any">
                <ByValue>
                  <SimulationTime value="2" rule="greater_than"/>
                </ByValue>
              </Condition>
            </ConditionGroup>
          </Start>
          <End>
            <ConditionGroup>
              <Condition name="done" delay="0">
                <ByState>
                  <AfterTermination type="event" name="slowdown" rule="end"/>
                </ByState>
              </Condition>
            </ConditionGroup>
          </End>
        </Conditions>
      </Act>
    </Story>
  </Storyboard>"#;

#[test]
fn full_document_produces_the_expected_graph() {
    let xml = scenario(STORYBOARD);
    let graph = load_str(&xml, Path::new("."), ControlOverride::ByScenario).unwrap();

    assert_eq!(graph.description, "test scenario");
    assert_eq!(graph.road_files.logic_path, "road.xodr");
    assert_eq!(graph.road_files.scene_graph_path, "scene.osgb");
    assert_eq!(graph.entities.len(), 2);

    // Parameter substitution reaches vehicle attributes.
    let target = graph.entities.by_name("Target").unwrap();
    assert_eq!(target.vehicle.name, "car_red");
    assert_eq!(target.vehicle.model_id, 2);

    // Init actions carry synthesized names and declaration order.
    assert_eq!(graph.init.len(), 2);
    assert_eq!(graph.init[0].name, "Init Ego Position");
    assert_eq!(graph.init[1].name, "Init Ego Longitudinal");
    match &graph.init[1].kind {
        ActionKind::Speed { dynamics, target } => {
            assert_eq!(dynamics.shape, DynamicsShape::Step);
            assert!(dynamics.timing.is_none());
            assert_eq!(*target, SpeedTarget::Absolute { value: 30.0 });
        }
        other => panic!("unexpected init action: {other:?}"),
    }

    let story = &graph.stories[0];
    assert_eq!(story.owner, "Target");
    let act = &story.acts[0];
    assert_eq!(act.start_groups.len(), 1);
    assert_eq!(act.end_groups.len(), 1);
    match &act.end_groups[0][0].kind {
        ConditionKind::AfterTermination {
            element,
            name,
            rule,
        } => {
            assert_eq!(*element, StoryElementKind::Event);
            assert_eq!(name, "slowdown");
            assert_eq!(*rule, TerminationRule::End);
        }
        other => panic!("unexpected end condition: {other:?}"),
    }

    // `$owner` resolves to the story owner inside the actor list.
    let seq = &act.sequences[0];
    assert_eq!(seq.repetitions, 2);
    assert_eq!(seq.actors, vec![graph.entities.id_of("Target").unwrap()]);

    let event = &seq.maneuvers[0].events[0];
    assert_eq!(event.priority, EventPriority::Overwrite);
    assert_eq!(event.actions.len(), 1);
    assert_eq!(event.actions[0].entity, graph.entities.id_of("Target").unwrap());

    let condition = &event.start_groups[0][0];
    assert_eq!(condition.edge, ConditionEdge::Rising);
    assert!((condition.delay - 0.5).abs() < 1e-9);
    match &condition.kind {
        ConditionKind::TimeHeadway {
            triggering,
            value,
            rule,
            freespace,
            ..
        } => {
            assert_eq!(triggering.rule, TriggerRule::Any);
            assert_eq!(triggering.members, vec![graph.entities.id_of("Ego").unwrap()]);
            assert!((*value - 1.5).abs() < 1e-9);
            assert_eq!(*rule, Rule::LessThan);
            assert!(*freespace);
        }
        other => panic!("unexpected start condition: {other:?}"),
    }
}

#[test]
fn missing_road_logic_fails_the_load() {
    let xml = r#"<OpenSCENARIO>
  <RoadNetwork>
    <SceneGraph filepath="scene.osgb"/>
  </RoadNetwork>
</OpenSCENARIO>"#;
    let error = load_str(xml, Path::new("."), ControlOverride::ByScenario).unwrap_err();
    assert!(matches!(error, ReaderError::MissingRoadLogic));
}

#[test]
fn malformed_xml_fails_the_load() {
    let error =
        load_str("<OpenSCENARIO><broken", Path::new("."), ControlOverride::ByScenario).unwrap_err();
    assert!(matches!(error, ReaderError::Xml { .. }));
}

#[test]
fn missing_scene_graph_falls_back_to_models_directory() {
    let xml = r#"<OpenSCENARIO>
  <RoadNetwork>
    <Logics filepath="road.xodr"/>
  </RoadNetwork>
</OpenSCENARIO>"#;
    let graph = load_str(xml, Path::new("/tmp/scenarios"), ControlOverride::ByScenario).unwrap();
    assert_eq!(graph.road_files.scene_graph_path, "/tmp/scenarios/../models/");
}

#[test]
fn relative_road_paths_are_anchored_at_the_scenario_directory() {
    let xml = r#"<OpenSCENARIO>
  <RoadNetwork>
    <Logics filepath="../roads/road.xodr"/>
    <SceneGraph filepath="scene.osgb"/>
  </RoadNetwork>
</OpenSCENARIO>"#;
    let graph = load_str(xml, Path::new("/tmp/scenarios"), ControlOverride::ByScenario).unwrap();
    assert_eq!(graph.road_files.logic_path, "/tmp/scenarios/../roads/road.xodr");
    assert_eq!(graph.road_files.scene_graph_path, "scene.osgb");
}

#[test]
fn duplicate_entity_names_keep_the_first_definition() {
    let xml = r#"<OpenSCENARIO>
  <RoadNetwork><Logics filepath="road.xodr"/></RoadNetwork>
  <Entities>
    <Object name="Ego">
      <Vehicle name="first" category="car"/>
    </Object>
    <Object name="Ego">
      <Vehicle name="second" category="car"/>
    </Object>
  </Entities>
</OpenSCENARIO>"#;
    let graph = load_str(xml, Path::new("."), ControlOverride::ByScenario).unwrap();
    assert_eq!(graph.entities.len(), 1);
    assert_eq!(graph.entities.by_name("Ego").unwrap().vehicle.name, "first");
}

#[test]
fn control_override_pins_the_first_entity() {
    let xml = scenario("");
    let graph = load_str(&xml, Path::new("."), ControlOverride::ForceOn).unwrap();
    assert!(graph.entities.by_name("Ego").unwrap().vehicle.control_external);
    assert!(!graph.entities.by_name("Target").unwrap().vehicle.control_external);

    let graph = load_str(&xml, Path::new("."), ControlOverride::ByScenario).unwrap();
    assert!(!graph.entities.by_name("Ego").unwrap().vehicle.control_external);
}

#[test]
fn unresolved_entity_reference_drops_the_condition() {
    let body = r#"<Storyboard>
    <Story name="story" owner="Ego">
      <Act name="act">
        <Sequence name="seq" numberOfExecutions="1">
          <Actors><Entity name="Ego"/></Actors>
          <Maneuver name="m">
            <Event name="e" priority="overwrite">
              <Action name="a">
                <Private>
                  <Longitudinal>
                    <Speed>
                      <Dynamics shape="step"/>
                      <Target><Absolute value="5"/></Target>
                    </Speed>
                  </Longitudinal>
                </Private>
              </Action>
              <StartConditions>
                <ConditionGroup>
                  <Condition name="ghost" delay="0">
                    <ByEntity>
                      <TriggeringEntities rule="any">
                        <Entity name="NoSuchEntity"/>
                      </TriggeringEntities>
                      <EntityCondition>
                        <TimeHeadway entity="Ego" value="1" rule="less_than"/>
                      </EntityCondition>
                    </ByEntity>
                  </Condition>
                  <Condition name="kept" delay="0">
                    <ByValue>
                      <SimulationTime value="1" rule="greater_than"/>
                    </ByValue>
                  </Condition>
                </ConditionGroup>
              </StartConditions>
            </Event>
          </Maneuver>
        </Sequence>
      </Act>
    </Story>
  </Storyboard>"#;
    let graph = load_str(&scenario(body), Path::new("."), ControlOverride::ByScenario).unwrap();
    let event = &graph.stories[0].acts[0].sequences[0].maneuvers[0].events[0];
    let group = &event.start_groups[0];
    assert_eq!(group.len(), 1);
    assert_eq!(group[0].name, "kept");
}

#[test]
fn invalid_priority_defaults_to_overwrite() {
    let body = r#"<Storyboard>
    <Story name="story" owner="Ego">
      <Act name="act">
        <Sequence name="seq" numberOfExecutions="0">
          <Actors><Entity name="Ego"/></Actors>
          <Maneuver name="m">
            <Event name="e" priority="urgent"/>
          </Maneuver>
        </Sequence>
      </Act>
    </Story>
  </Storyboard>"#;
    let graph = load_str(&scenario(body), Path::new("."), ControlOverride::ByScenario).unwrap();
    let seq = &graph.stories[0].acts[0].sequences[0];
    // Zero executions is clamped to one.
    assert_eq!(seq.repetitions, 1);
    assert_eq!(seq.maneuvers[0].events[0].priority, EventPriority::Overwrite);
}

#[test]
fn boolean_attributes_are_strict() {
    let body = r#"<Storyboard>
    <Init>
      <Actions>
        <Private object="Ego">
          <Autonomous activate="True" domain="longitudinal"/>
          <Autonomous activate="1" domain="lateral"/>
        </Private>
      </Actions>
    </Init>
  </Storyboard>"#;
    let graph = load_str(&scenario(body), Path::new("."), ControlOverride::ByScenario).unwrap();
    assert_eq!(graph.init.len(), 2);
    // "True" is not a valid token and falls back to false; "1" is valid.
    match (&graph.init[0].kind, &graph.init[1].kind) {
        (
            ActionKind::Autonomous {
                activate: first, ..
            },
            ActionKind::Autonomous {
                activate: second, ..
            },
        ) => {
            assert!(!*first);
            assert!(*second);
        }
        other => panic!("unexpected init actions: {other:?}"),
    }
}

#[test]
fn rate_timing_is_parsed_from_the_dynamics_attribute() {
    let body = r#"<Storyboard>
    <Init>
      <Actions>
        <Private object="Ego">
          <Longitudinal>
            <Speed>
              <Dynamics shape="linear" rate="2.5"/>
              <Target><Absolute value="20"/></Target>
            </Speed>
          </Longitudinal>
        </Private>
      </Actions>
    </Init>
  </Storyboard>"#;
    let graph = load_str(&scenario(body), Path::new("."), ControlOverride::ByScenario).unwrap();
    match &graph.init[0].kind {
        ActionKind::Speed { dynamics, .. } => {
            let timing = dynamics.timing.unwrap();
            assert_eq!(timing.kind, TimingKind::Rate);
            assert!((timing.value - 2.5).abs() < 1e-9);
        }
        other => panic!("unexpected init action: {other:?}"),
    }
}

#[test]
fn vehicle_and_maneuver_catalogs_resolve_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("vehicles.xosc"),
        r#"<OpenSCENARIO>
  <Catalog name="VehicleCatalog">
    <Vehicle name="car_red" category="car">
      <Properties>
        <Property name="model_id" value="2"/>
        <Property name="control" value="external"/>
      </Properties>
    </Vehicle>
  </Catalog>
</OpenSCENARIO>"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("maneuvers.xosc"),
        r#"<OpenSCENARIO>
  <Catalog name="ManeuverCatalog">
    <Maneuver name="cut_in">
      <Event name="lane_change" priority="overwrite">
        <Action name="change">
          <Private>
            <Lateral>
              <LaneChange targetLaneOffset="0">
                <Dynamics shape="sinusoidal" time="2"/>
                <Target><Absolute value="-1"/></Target>
              </LaneChange>
            </Lateral>
          </Private>
        </Action>
        <StartConditions>
          <ConditionGroup>
            <Condition name="go" delay="0">
              <ByValue>
                <SimulationTime value="1" rule="greater_than"/>
              </ByValue>
            </Condition>
          </ConditionGroup>
        </StartConditions>
      </Event>
    </Maneuver>
  </Catalog>
</OpenSCENARIO>"#,
    )
    .unwrap();

    let xml = r#"<OpenSCENARIO>
  <RoadNetwork><Logics filepath="road.xodr"/></RoadNetwork>
  <Catalogs>
    <VehicleCatalog><Directory path="vehicles.xosc"/></VehicleCatalog>
    <ManeuverCatalog><Directory path="maneuvers.xosc"/></ManeuverCatalog>
  </Catalogs>
  <Entities>
    <Object name="Target">
      <CatalogReference catalogName="VehicleCatalog" entryName="car_red"/>
    </Object>
  </Entities>
  <Storyboard>
    <Story name="story" owner="Target">
      <Act name="act">
        <Sequence name="seq" numberOfExecutions="1">
          <Actors><Entity name="Target"/></Actors>
          <CatalogReference catalogName="ManeuverCatalog" entryName="cut_in"/>
        </Sequence>
      </Act>
    </Story>
  </Storyboard>
</OpenSCENARIO>"#;

    let graph = load_str(xml, dir.path(), ControlOverride::ByScenario).unwrap();

    // The cloned vehicle carries catalog properties, including control.
    let target = graph.entities.by_name("Target").unwrap();
    assert_eq!(target.vehicle.name, "car_red");
    assert_eq!(target.vehicle.model_id, 2);
    assert!(target.vehicle.control_external);

    // The maneuver template expanded against the sequence's actors.
    let maneuver = &graph.stories[0].acts[0].sequences[0].maneuvers[0];
    assert_eq!(maneuver.name, "cut_in");
    let event = &maneuver.events[0];
    assert_eq!(event.actions.len(), 1);
    assert_eq!(event.actions[0].entity, graph.entities.id_of("Target").unwrap());
    assert!(matches!(event.actions[0].kind, ActionKind::LaneChange { .. }));
}

#[test]
fn load_reads_the_scenario_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.xosc");
    std::fs::write(&path, scenario(STORYBOARD)).unwrap();

    let graph = load(&path, ControlOverride::ByScenario).unwrap();
    assert_eq!(graph.entities.len(), 2);
    assert_eq!(graph.stories.len(), 1);

    let error = load(&dir.path().join("missing.xosc"), ControlOverride::ByScenario).unwrap_err();
    assert!(matches!(error, ReaderError::Io { .. }));
}
