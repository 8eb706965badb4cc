//! The scenario engine: story scheduling, arbitration, and entity motion.
//!
//! [`ScenarioEngine`] owns the parsed [`ScenarioGraph`] plus all runtime
//! state: one kinematic record per entity and one state machine per story
//! element. `step` advances the simulation by one fixed tick in phases:
//!
//! 1. snapshot entity states and the element registry
//! 2. act transitions (start and end triggers)
//! 3. event triggers and priority arbitration
//! 4. tick running actions, collecting effects
//! 5. completion propagation up the story tree
//! 6. apply effects, default motion, and gateway reports
//!
//! All trigger and action evaluation inside one tick reads the phase-1
//! snapshots, so nothing within a tick can observe another element's
//! writes from the same tick.

use roadshow_types::{
    ActionSpec, ControlDomain, EntityId, EventPriority, ScenarioGraph, StoryElementKind, WorldPose,
};
use roadshow_world::{RoadNetwork, RoadPosition, VehicleModel, VehicleState};
use tracing::{debug, info, warn};

use crate::action::{ActionCtx, ActionEffect, ActionRuntime, domains_overlap, spec_domain};
use crate::condition::{ConditionInstance, TriggerContext, evaluate_groups, reset_groups};
use crate::gateway::{Gateway, ObjectState, Recorder};
use crate::resolve::{EntitySnapshot, SnapshotMap, resolve_pose};
use crate::state::{ElementRegistry, ElementState, Termination};

/// Kinematic runtime state of one entity.
struct EntityRuntime {
    id: EntityId,
    name: String,
    model_id: i32,
    external: bool,
    length: f64,
    width: f64,
    speed: f64,
    position: Box<dyn RoadPosition>,
    /// Longitudinal autonomy flag set by autonomous actions.
    auto_longitudinal: bool,
    /// Lateral autonomy flag set by autonomous actions.
    auto_lateral: bool,
}

/// Runtime state of one event.
struct EventRuntime {
    name: String,
    priority: EventPriority,
    specs: Vec<ActionSpec>,
    start: Vec<Vec<ConditionInstance>>,
    state: ElementState,
    /// Waiting for a conflicting event to finish (following priority).
    queued: bool,
    running: Vec<ActionRuntime>,
}

impl EventRuntime {
    /// Actor/domain footprint of this event while running or starting.
    fn footprint(&self) -> Vec<(EntityId, ControlDomain)> {
        self.specs
            .iter()
            .map(|spec| (spec.entity, spec_domain(&spec.kind)))
            .collect()
    }
}

struct ManeuverRuntime {
    name: String,
    state: ElementState,
    events: Vec<EventRuntime>,
}

struct SequenceRuntime {
    name: String,
    state: ElementState,
    /// Runs left, including the current one.
    remaining: u32,
    maneuvers: Vec<ManeuverRuntime>,
}

struct ActRuntime {
    name: String,
    state: ElementState,
    start: Vec<Vec<ConditionInstance>>,
    end: Vec<Vec<ConditionInstance>>,
    sequences: Vec<SequenceRuntime>,
}

struct StoryRuntime {
    name: String,
    acts: Vec<ActRuntime>,
}

/// Index path to one event in the runtime story tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EventPath {
    story: usize,
    act: usize,
    sequence: usize,
    maneuver: usize,
    event: usize,
}

fn wrap_groups(groups: &[Vec<roadshow_types::Condition>]) -> Vec<Vec<ConditionInstance>> {
    groups
        .iter()
        .map(|group| group.iter().cloned().map(ConditionInstance::new).collect())
        .collect()
}

fn build_stories(graph: &ScenarioGraph) -> Vec<StoryRuntime> {
    graph
        .stories
        .iter()
        .map(|story| StoryRuntime {
            name: story.name.clone(),
            acts: story
                .acts
                .iter()
                .map(|act| ActRuntime {
                    name: act.name.clone(),
                    state: ElementState::NotStarted,
                    start: wrap_groups(&act.start_groups),
                    end: wrap_groups(&act.end_groups),
                    sequences: act
                        .sequences
                        .iter()
                        .map(|sequence| SequenceRuntime {
                            name: sequence.name.clone(),
                            state: ElementState::NotStarted,
                            remaining: sequence.repetitions.max(1),
                            maneuvers: sequence
                                .maneuvers
                                .iter()
                                .map(|maneuver| ManeuverRuntime {
                                    name: maneuver.name.clone(),
                                    state: ElementState::NotStarted,
                                    events: maneuver
                                        .events
                                        .iter()
                                        .map(|event| EventRuntime {
                                            name: event.name.clone(),
                                            priority: event.priority,
                                            specs: event.actions.clone(),
                                            start: wrap_groups(&event.start_groups),
                                            state: ElementState::NotStarted,
                                            queued: false,
                                            running: Vec::new(),
                                        })
                                        .collect(),
                                })
                                .collect(),
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect()
}

fn build_entities(graph: &ScenarioGraph, network: &dyn RoadNetwork) -> Vec<EntityRuntime> {
    graph
        .entities
        .iter()
        .map(|entity| EntityRuntime {
            id: entity.id,
            name: entity.name.clone(),
            model_id: entity.vehicle.model_id,
            external: entity.vehicle.control_external,
            length: entity.vehicle.dimensions.length,
            width: entity.vehicle.dimensions.width,
            speed: 0.0,
            position: network.new_position(),
            auto_longitudinal: false,
            auto_lateral: false,
        })
        .collect()
}

fn build_snapshots(entities: &[EntityRuntime]) -> SnapshotMap {
    entities
        .iter()
        .map(|e| {
            (
                e.id,
                EntitySnapshot {
                    id: e.id,
                    pose: e.position.world(),
                    road: e.position.road(),
                    speed: e.speed,
                    length: e.length,
                    width: e.width,
                },
            )
        })
        .collect()
}

/// Cancel a running event: its actions and the event itself terminate as
/// cancelled.
fn cancel_event(event: &mut EventRuntime, registry: &mut ElementRegistry) {
    for action in event.running.drain(..) {
        registry.set_terminated(StoryElementKind::Action, action.name(), Termination::Cancelled);
    }
    event.state = ElementState::Done;
    event.queued = false;
    registry.set_terminated(StoryElementKind::Event, &event.name, Termination::Cancelled);
    debug!(event = event.name, "event cancelled");
}

/// Mark a never-run event as skipped.
fn skip_event(event: &mut EventRuntime, registry: &mut ElementRegistry) {
    event.state = ElementState::Skipped;
    event.queued = false;
    registry.set_state(StoryElementKind::Event, &event.name, ElementState::Skipped);
    debug!(event = event.name, "event skipped");
}

/// Start a triggered event: one action runtime per spec, skipping specs
/// that fail to start.
fn start_event(event: &mut EventRuntime, ctx: &ActionCtx<'_>, registry: &mut ElementRegistry) {
    event.state = ElementState::Running;
    event.queued = false;
    registry.set_state(StoryElementKind::Event, &event.name, ElementState::Running);
    info!(event = event.name, "event started");
    for spec in &event.specs {
        match ActionRuntime::start(spec, ctx) {
            Ok(runtime) => {
                registry.set_state(StoryElementKind::Action, runtime.name(), ElementState::Running);
                event.running.push(runtime);
            }
            Err(error) => {
                warn!(%error, "action failed to start, skipping it");
                registry.set_state(StoryElementKind::Action, &spec.name, ElementState::Skipped);
            }
        }
    }
}

/// Terminate a whole act: running descendants cancel, untouched ones skip.
fn terminate_act(act: &mut ActRuntime, registry: &mut ElementRegistry, termination: Termination) {
    for sequence in &mut act.sequences {
        for maneuver in &mut sequence.maneuvers {
            for event in &mut maneuver.events {
                match event.state {
                    ElementState::Running => cancel_event(event, registry),
                    ElementState::NotStarted => skip_event(event, registry),
                    ElementState::Done | ElementState::Skipped => {}
                }
            }
            if maneuver.state == ElementState::Running {
                maneuver.state = ElementState::Done;
                registry.set_terminated(
                    StoryElementKind::Maneuver,
                    &maneuver.name,
                    Termination::Cancelled,
                );
            }
        }
        if sequence.state == ElementState::Running {
            sequence.state = ElementState::Done;
            registry.set_terminated(StoryElementKind::Scene, &sequence.name, Termination::Cancelled);
        }
    }
    act.state = ElementState::Done;
    registry.set_terminated(StoryElementKind::Act, &act.name, termination);
    info!(act = act.name, "act terminated");
}

/// Decide the fate of each candidate event against what is running.
///
/// Candidates arrive in declaration order: queued followers ahead of
/// newly fired events within the same walk of the story tree, which is
/// what makes same-tick double overwrites deterministic.
fn arbitrate(
    stories: &mut [StoryRuntime],
    registry: &mut ElementRegistry,
    candidates: &[EventPath],
    running: &mut Vec<(EventPath, Vec<(EntityId, ControlDomain)>)>,
    ctx: &ActionCtx<'_>,
) {
    for &path in candidates {
        let Some(event) = event_mut(stories, path) else {
            continue;
        };
        let footprint = event.footprint();
        let priority = event.priority;
        let conflicts: Vec<EventPath> = running
            .iter()
            .filter(|(other, other_footprint)| {
                *other != path
                    && footprint.iter().any(|(entity, domain)| {
                        other_footprint
                            .iter()
                            .any(|(oe, od)| oe == entity && domains_overlap(*domain, *od))
                    })
            })
            .map(|(other, _)| *other)
            .collect();

        if conflicts.is_empty() {
            if let Some(event) = event_mut(stories, path) {
                start_event(event, ctx, registry);
                running.push((path, footprint));
            }
            continue;
        }

        match priority {
            EventPriority::Overwrite => {
                for conflict in &conflicts {
                    if let Some(victim) = event_mut(stories, *conflict) {
                        cancel_event(victim, registry);
                    }
                    running.retain(|(p, _)| p != conflict);
                }
                if let Some(event) = event_mut(stories, path) {
                    start_event(event, ctx, registry);
                    running.push((path, footprint));
                }
            }
            EventPriority::Following => {
                if let Some(event) = event_mut(stories, path) {
                    if !event.queued {
                        debug!(event = event.name, "event queued behind a conflicting event");
                        event.queued = true;
                    }
                }
            }
            EventPriority::Skip => {
                if let Some(event) = event_mut(stories, path) {
                    skip_event(event, registry);
                }
            }
        }
    }
}

fn event_mut<'a>(stories: &'a mut [StoryRuntime], path: EventPath) -> Option<&'a mut EventRuntime> {
    stories
        .get_mut(path.story)?
        .acts
        .get_mut(path.act)?
        .sequences
        .get_mut(path.sequence)?
        .maneuvers
        .get_mut(path.maneuver)?
        .events
        .get_mut(path.event)
}

/// The interpreting scenario engine.
///
/// Construction wires the parsed document to a road network and a vehicle
/// model; `step` then drives everything. The engine never fails a tick:
/// semantic problems are logged and the offending element is skipped.
pub struct ScenarioEngine {
    graph: ScenarioGraph,
    network: Box<dyn RoadNetwork>,
    model: Box<dyn VehicleModel>,
    gateway: Gateway,
    registry: ElementRegistry,
    entities: Vec<EntityRuntime>,
    stories: Vec<StoryRuntime>,
    now: f64,
    started: bool,
}

impl ScenarioEngine {
    /// Build the runtime state for a parsed scenario.
    pub fn new(
        graph: ScenarioGraph,
        network: Box<dyn RoadNetwork>,
        model: Box<dyn VehicleModel>,
    ) -> Self {
        let entities = build_entities(&graph, network.as_ref());
        let stories = build_stories(&graph);
        info!(
            entities = entities.len(),
            stories = stories.len(),
            description = graph.description,
            "scenario engine ready"
        );
        Self {
            graph,
            network,
            model,
            gateway: Gateway::new(),
            registry: ElementRegistry::new(),
            entities,
            stories,
            now: 0.0,
            started: false,
        }
    }

    /// The parsed document the engine runs.
    pub const fn graph(&self) -> &ScenarioGraph {
        &self.graph
    }

    /// Current simulation time in seconds.
    pub const fn now(&self) -> f64 {
        self.now
    }

    /// Latest reported states.
    pub const fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Record all subsequent reports to the given recorder.
    pub fn attach_recorder(&mut self, recorder: Recorder) {
        self.gateway.attach_recorder(recorder);
    }

    /// Flush and detach the recorder, if any.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RecordError::Io`] when the final flush fails.
    pub fn finish_recording(&mut self) -> Result<(), crate::error::RecordError> {
        self.gateway.finish_recording()
    }

    /// Frozen view of one entity's current state.
    pub fn snapshot(&self, id: EntityId) -> Option<EntitySnapshot> {
        self.entities.iter().find(|e| e.id == id).map(|e| EntitySnapshot {
            id: e.id,
            pose: e.position.world(),
            road: e.position.road(),
            speed: e.speed,
            length: e.length,
            width: e.width,
        })
    }

    /// Lifecycle record of a named story element.
    pub fn element_record(
        &self,
        kind: StoryElementKind,
        name: &str,
    ) -> Option<crate::state::ElementRecord> {
        self.registry.record(kind, name)
    }

    /// Whether every act has terminated.
    pub fn completed(&self) -> bool {
        self.started
            && self
                .stories
                .iter()
                .all(|s| s.acts.iter().all(|a| a.state == ElementState::Done))
    }

    /// Push an externally computed state for an external entity.
    ///
    /// The pose and speed take effect immediately; the next `step` reports
    /// them through the gateway like any scenario-driven state.
    pub fn report_external(&mut self, id: EntityId, pose: WorldPose, speed: f64) {
        let Some(entity) = self.entities.iter_mut().find(|e| e.id == id) else {
            warn!(%id, "external report for an unknown entity");
            return;
        };
        if !entity.external {
            warn!(entity = entity.name, "external report for a scenario-controlled entity");
        }
        entity.position.set_world(pose);
        entity.speed = speed;
    }

    /// Forcefully terminate a named act.
    ///
    /// Running descendants cancel, never-run events skip, and the act's
    /// termination is recorded as cancelled. Returns `false` when no act
    /// by that name exists.
    pub fn terminate_act(&mut self, name: &str) -> bool {
        for story in &mut self.stories {
            for act in &mut story.acts {
                if act.name == name {
                    if act.state != ElementState::Done {
                        terminate_act(act, &mut self.registry, Termination::Cancelled);
                    }
                    return true;
                }
            }
        }
        warn!(act = name, "terminate request for an unknown act");
        false
    }

    /// Forcefully terminate a named event.
    ///
    /// A running event cancels with its actions; a not-yet-started event
    /// is skipped. Returns `false` when no event by that name exists.
    pub fn terminate_event(&mut self, name: &str) -> bool {
        for story in &mut self.stories {
            for act in &mut story.acts {
                for sequence in &mut act.sequences {
                    for maneuver in &mut sequence.maneuvers {
                        for event in &mut maneuver.events {
                            if event.name == name {
                                match event.state {
                                    ElementState::Running => {
                                        cancel_event(event, &mut self.registry);
                                    }
                                    ElementState::NotStarted => {
                                        skip_event(event, &mut self.registry);
                                    }
                                    ElementState::Done | ElementState::Skipped => {}
                                }
                                return true;
                            }
                        }
                    }
                }
            }
        }
        warn!(event = name, "terminate request for an unknown event");
        false
    }

    /// Terminate every act that has not finished, ending the scenario.
    pub fn abort(&mut self) {
        info!("scenario aborted");
        for story in &mut self.stories {
            for act in &mut story.acts {
                if act.state != ElementState::Done {
                    terminate_act(act, &mut self.registry, Termination::Cancelled);
                }
            }
        }
        self.started = true;
    }

    /// Advance the simulation by `dt` seconds.
    #[allow(clippy::too_many_lines, clippy::cognitive_complexity)]
    pub fn step(&mut self, dt: f64) {
        let dt = if dt > 0.0 {
            dt
        } else {
            warn!(dt, "non-positive step size, clamping to zero");
            0.0
        };

        if !self.started {
            self.apply_init();
            self.started = true;
        }

        let snapshots = build_snapshots(&self.entities);
        let registry_view = self.registry.clone();
        let trigger_ctx = TriggerContext {
            now: self.now,
            snapshots: &snapshots,
            registry: &registry_view,
            network: self.network.as_ref(),
        };
        let action_ctx = ActionCtx {
            now: self.now,
            dt,
            snapshots: &snapshots,
            network: self.network.as_ref(),
        };

        // Act transitions.
        for story in &mut self.stories {
            for act in &mut story.acts {
                match act.state {
                    ElementState::NotStarted => {
                        // An absent start trigger starts the act at once.
                        if act.start.is_empty() || evaluate_groups(&mut act.start, &trigger_ctx) {
                            start_act(act, &mut self.registry);
                        }
                    }
                    ElementState::Running => {
                        // An absent end trigger never fires; the act ends
                        // by natural completion instead.
                        if evaluate_groups(&mut act.end, &trigger_ctx) {
                            terminate_act(act, &mut self.registry, Termination::Completed);
                        }
                    }
                    ElementState::Done | ElementState::Skipped => {}
                }
            }
        }

        // Collect the footprints of everything already running, then let
        // queued and newly fired events through arbitration in
        // declaration order.
        let mut running: Vec<(EventPath, Vec<(EntityId, ControlDomain)>)> = Vec::new();
        let mut candidates: Vec<EventPath> = Vec::new();
        for (si, story) in self.stories.iter_mut().enumerate() {
            for (ai, act) in story.acts.iter_mut().enumerate() {
                if act.state != ElementState::Running {
                    continue;
                }
                for (qi, sequence) in act.sequences.iter_mut().enumerate() {
                    for (mi, maneuver) in sequence.maneuvers.iter_mut().enumerate() {
                        for (ei, event) in maneuver.events.iter_mut().enumerate() {
                            let path = EventPath {
                                story: si,
                                act: ai,
                                sequence: qi,
                                maneuver: mi,
                                event: ei,
                            };
                            if event.state == ElementState::Running {
                                running.push((path, event.footprint()));
                            } else if event.queued {
                                candidates.push(path);
                            } else if event.state == ElementState::NotStarted
                                && (event.start.is_empty()
                                    || evaluate_groups(&mut event.start, &trigger_ctx))
                            {
                                candidates.push(path);
                            }
                        }
                    }
                }
            }
        }
        arbitrate(
            &mut self.stories,
            &mut self.registry,
            &candidates,
            &mut running,
            &action_ctx,
        );

        // Tick running actions and collect effects in emission order.
        let mut effects: Vec<(EntityId, ActionEffect)> = Vec::new();
        for story in &mut self.stories {
            for act in &mut story.acts {
                for sequence in &mut act.sequences {
                    for maneuver in &mut sequence.maneuvers {
                        for event in &mut maneuver.events {
                            if event.state != ElementState::Running {
                                continue;
                            }
                            let mut still_running = Vec::new();
                            for mut action in event.running.drain(..) {
                                let tick = action.tick(&action_ctx);
                                for effect in tick.effects {
                                    effects.push((action.entity(), effect));
                                }
                                if tick.done {
                                    debug!(action = action.name(), "action completed");
                                    self.registry.set_terminated(
                                        StoryElementKind::Action,
                                        action.name(),
                                        Termination::Completed,
                                    );
                                } else {
                                    still_running.push(action);
                                }
                            }
                            event.running = still_running;
                            if event.running.is_empty() {
                                event.state = ElementState::Done;
                                self.registry.set_terminated(
                                    StoryElementKind::Event,
                                    &event.name,
                                    Termination::Completed,
                                );
                                debug!(event = event.name, "event completed");
                            }
                        }
                    }
                }
            }
        }

        self.propagate_completions();
        self.apply_effects(effects, &snapshots, dt);

        // Default motion: scenario-controlled entities advance along the
        // road by their average speed over the tick; external entities
        // move only through external reports.
        for entity in &mut self.entities {
            if entity.external {
                continue;
            }
            let before = snapshots.get(&entity.id).map_or(entity.speed, |s| s.speed);
            let ds = f64::midpoint(before, entity.speed) * dt;
            if entity.position.move_along(ds).is_err() {
                // Clamped at the road boundary; hold there.
                entity.speed = 0.0;
            }
        }

        self.now += dt;
        for entity in &self.entities {
            self.gateway.report_object(ObjectState {
                id: entity.id,
                name: entity.name.clone(),
                model_id: entity.model_id,
                external: entity.external,
                timestamp: self.now,
                pose: entity.position.world(),
                road: entity.position.road(),
                speed: entity.speed,
            });
        }
    }

    /// Apply the init actions instantaneously, before the first tick.
    fn apply_init(&mut self) {
        info!(actions = self.graph.init.len(), "applying init actions");
        let init = self.graph.init.clone();
        // Teleports change poses that later init actions may reference,
        // so snapshots are rebuilt per action.
        for spec in &init {
            let snapshots = build_snapshots(&self.entities);
            let ctx = ActionCtx {
                now: 0.0,
                dt: 0.0,
                snapshots: &snapshots,
                network: self.network.as_ref(),
            };
            match ActionRuntime::start(spec, &ctx) {
                Ok(mut action) => {
                    let tick = action.tick(&ctx);
                    let effects = tick
                        .effects
                        .into_iter()
                        .map(|effect| (spec.entity, effect))
                        .collect();
                    self.apply_effects(effects, &snapshots, 0.0);
                    self.registry.set_terminated(
                        StoryElementKind::Action,
                        &spec.name,
                        Termination::Completed,
                    );
                }
                Err(error) => {
                    warn!(%error, "init action failed to start, skipping it");
                }
            }
        }
    }

    /// Propagate event completions up: maneuvers, sequence repetitions,
    /// natural act completion.
    fn propagate_completions(&mut self) {
        for story in &mut self.stories {
            for act in &mut story.acts {
                if act.state != ElementState::Running {
                    continue;
                }
                for sequence in &mut act.sequences {
                    if sequence.state != ElementState::Running {
                        continue;
                    }
                    for maneuver in &mut sequence.maneuvers {
                        if maneuver.state == ElementState::Running
                            && maneuver.events.iter().all(|e| {
                                matches!(e.state, ElementState::Done | ElementState::Skipped)
                            })
                        {
                            maneuver.state = ElementState::Done;
                            self.registry.set_terminated(
                                StoryElementKind::Maneuver,
                                &maneuver.name,
                                Termination::Completed,
                            );
                            debug!(maneuver = maneuver.name, "maneuver completed");
                        }
                    }
                    if sequence
                        .maneuvers
                        .iter()
                        .all(|m| m.state == ElementState::Done)
                    {
                        if sequence.remaining > 1 {
                            sequence.remaining = sequence.remaining.saturating_sub(1);
                            rearm_sequence(sequence, &mut self.registry);
                        } else {
                            sequence.state = ElementState::Done;
                            self.registry.set_terminated(
                                StoryElementKind::Scene,
                                &sequence.name,
                                Termination::Completed,
                            );
                            debug!(sequence = sequence.name, "sequence completed");
                        }
                    }
                }
                if act
                    .sequences
                    .iter()
                    .all(|s| s.state == ElementState::Done)
                {
                    terminate_act(act, &mut self.registry, Termination::Completed);
                }
            }
        }
    }

    /// Apply collected effects to entity runtime state in emission order.
    fn apply_effects(
        &mut self,
        effects: Vec<(EntityId, ActionEffect)>,
        snapshots: &SnapshotMap,
        dt: f64,
    ) {
        for (id, effect) in effects {
            let Some(entity) = self.entities.iter_mut().find(|e| e.id == id) else {
                continue;
            };
            match effect {
                ActionEffect::SetSpeed(speed) => {
                    entity.speed = speed.max(0.0);
                }
                ActionEffect::Drive(command) => {
                    let state = VehicleState {
                        pose: entity.position.world(),
                        speed: entity.speed,
                    };
                    // The model shapes the speed change; the pose still
                    // comes from road-frame default motion.
                    entity.speed = self.model.step(dt, &state, &command).speed.max(0.0);
                }
                ActionEffect::LaneOffset(offset) => {
                    entity.position.set_lane_offset(offset);
                }
                ActionEffect::CommitLane { lane_id, offset } => {
                    let road = entity.position.road();
                    entity.position.set_lane(road.road_id, lane_id, road.s, offset);
                }
                ActionEffect::Teleport(spec) => {
                    use roadshow_types::PositionSpec;
                    match spec.as_ref() {
                        PositionSpec::Lane {
                            road_id,
                            lane_id,
                            s,
                            offset,
                            ..
                        } => entity.position.set_lane(*road_id, *lane_id, *s, *offset),
                        PositionSpec::Route {
                            route,
                            lane_id,
                            path_s,
                            lane_offset,
                        } => entity
                            .position
                            .set_route(route, *lane_id, *path_s, *lane_offset),
                        other => {
                            if let Some(pose) =
                                resolve_pose(other, self.network.as_ref(), snapshots)
                            {
                                entity.position.set_world(pose);
                            } else {
                                warn!(entity = entity.name, "teleport target did not resolve");
                            }
                        }
                    }
                }
                ActionEffect::AssignRoute(route) => {
                    use roadshow_types::PositionSpec;
                    // Enter the route at its first lane-flavored waypoint.
                    let entry = route.waypoints.iter().find_map(|wp| match wp {
                        PositionSpec::Lane {
                            lane_id, s, offset, ..
                        } => Some((*lane_id, *s, *offset)),
                        _ => None,
                    });
                    let road = entity.position.road();
                    let (lane_id, s, offset) =
                        entry.unwrap_or((road.lane_id, road.s, road.offset));
                    entity.position.set_route(&route, lane_id, s, offset);
                    info!(entity = entity.name, route = route.name, "route assigned");
                }
                ActionEffect::Autonomy { activate, domain } => {
                    match domain {
                        ControlDomain::Longitudinal => entity.auto_longitudinal = activate,
                        ControlDomain::Lateral => entity.auto_lateral = activate,
                        ControlDomain::Both => {
                            entity.auto_longitudinal = activate;
                            entity.auto_lateral = activate;
                        }
                    }
                    info!(
                        entity = entity.name,
                        activate,
                        ?domain,
                        "autonomy toggled"
                    );
                }
            }
        }
    }
}

/// Start an act: its sequences and maneuvers begin running.
fn start_act(act: &mut ActRuntime, registry: &mut ElementRegistry) {
    act.state = ElementState::Running;
    registry.set_state(StoryElementKind::Act, &act.name, ElementState::Running);
    info!(act = act.name, "act started");
    for sequence in &mut act.sequences {
        sequence.state = ElementState::Running;
        registry.set_state(StoryElementKind::Scene, &sequence.name, ElementState::Running);
        for maneuver in &mut sequence.maneuvers {
            maneuver.state = ElementState::Running;
            registry.set_state(
                StoryElementKind::Maneuver,
                &maneuver.name,
                ElementState::Running,
            );
        }
    }
}

/// Re-arm a sequence for its next repetition: maneuvers and events reset
/// to untriggered, including all edge and delay state.
fn rearm_sequence(sequence: &mut SequenceRuntime, registry: &mut ElementRegistry) {
    info!(
        sequence = sequence.name,
        remaining = sequence.remaining,
        "sequence repeating"
    );
    for maneuver in &mut sequence.maneuvers {
        maneuver.state = ElementState::Running;
        registry.set_state(
            StoryElementKind::Maneuver,
            &maneuver.name,
            ElementState::Running,
        );
        for event in &mut maneuver.events {
            event.state = ElementState::NotStarted;
            event.queued = false;
            event.running.clear();
            reset_groups(&mut event.start);
            registry.set_state(StoryElementKind::Event, &event.name, ElementState::NotStarted);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use roadshow_types::{
        ActionKind, Condition, ConditionEdge, ConditionKind, Dimensions, DynamicsShape, EntityPool,
        EventPriority, PropertySet, RoadFiles, Rule, SpeedTarget, Timing, TimingKind,
        TransitionDynamics, VehicleCategory, VehicleSpec,
        story::{Act, Event, Maneuver, Sequence, Story},
    };
    use roadshow_world::{KinematicModel, StraightRoad};

    fn make_vehicle(external: bool) -> VehicleSpec {
        VehicleSpec {
            name: "car_white".to_owned(),
            category: VehicleCategory::Car,
            model_id: 1,
            model_path: None,
            control_external: external,
            dimensions: Dimensions::default(),
            properties: PropertySet::default(),
        }
    }

    fn time_condition(threshold: f64) -> Condition {
        Condition {
            name: "at-time".to_owned(),
            delay: 0.0,
            edge: ConditionEdge::Rising,
            kind: ConditionKind::SimulationTime {
                value: threshold,
                rule: Rule::GreaterThan,
            },
        }
    }

    fn speed_event(name: &str, entity: EntityId, target: f64, at: f64) -> Event {
        Event {
            name: name.to_owned(),
            priority: EventPriority::Overwrite,
            actions: vec![ActionSpec {
                name: format!("{name} action"),
                entity,
                kind: ActionKind::Speed {
                    dynamics: TransitionDynamics {
                        shape: DynamicsShape::Step,
                        timing: None,
                    },
                    target: SpeedTarget::Absolute { value: target },
                },
            }],
            start_groups: vec![vec![time_condition(at)]],
        }
    }

    fn slow_ramp(target: f64) -> ActionKind {
        ActionKind::Speed {
            dynamics: TransitionDynamics {
                shape: DynamicsShape::Linear,
                timing: Some(Timing {
                    kind: TimingKind::Time,
                    value: 100.0,
                }),
            },
            target: SpeedTarget::Absolute { value: target },
        }
    }

    fn make_graph(events: Vec<Event>, init_speed: f64) -> ScenarioGraph {
        let mut entities = EntityPool::new();
        let ego = entities.add("Ego".to_owned(), make_vehicle(false));
        ScenarioGraph {
            description: "engine test".to_owned(),
            road_files: RoadFiles {
                logic_path: "road.xodr".to_owned(),
                scene_graph_path: "scene.osgb".to_owned(),
            },
            entities,
            init: vec![ActionSpec {
                name: "Init Ego Speed".to_owned(),
                entity: ego,
                kind: ActionKind::Speed {
                    dynamics: TransitionDynamics {
                        shape: DynamicsShape::Step,
                        timing: None,
                    },
                    target: SpeedTarget::Absolute { value: init_speed },
                },
            }],
            stories: vec![Story {
                name: "story".to_owned(),
                owner: "Ego".to_owned(),
                acts: vec![Act {
                    name: "act".to_owned(),
                    sequences: vec![Sequence {
                        name: "seq".to_owned(),
                        actors: vec![ego],
                        repetitions: 1,
                        maneuvers: vec![Maneuver {
                            name: "man".to_owned(),
                            events,
                        }],
                    }],
                    start_groups: Vec::new(),
                    end_groups: Vec::new(),
                }],
            }],
        }
    }

    fn make_engine(graph: ScenarioGraph) -> ScenarioEngine {
        ScenarioEngine::new(
            graph,
            Box::new(StraightRoad::new(1, 10_000.0, 3.5).unwrap()),
            Box::new(KinematicModel::default()),
        )
    }

    #[test]
    fn init_actions_apply_before_the_first_tick_completes() {
        let ego = EntityId::new(0);
        let mut engine = make_engine(make_graph(vec![speed_event("never", ego, 5.0, 1e9)], 20.0));
        engine.step(0.1);

        let snap = engine.snapshot(ego).unwrap();
        assert_eq!(snap.speed, 20.0);
        // One tick of motion at the init speed.
        assert!((snap.road.s - 2.0).abs() < 1e-9);
    }

    #[test]
    fn timed_event_changes_the_speed_once_fired() {
        let ego = EntityId::new(0);
        let mut engine = make_engine(make_graph(vec![speed_event("brake", ego, 5.0, 1.0)], 20.0));

        for _ in 0..10 {
            engine.step(0.1);
        }
        assert_eq!(engine.snapshot(ego).unwrap().speed, 20.0);

        engine.step(0.1);
        engine.step(0.1);
        assert_eq!(engine.snapshot(ego).unwrap().speed, 5.0);
        let record = engine
            .element_record(StoryElementKind::Event, "brake")
            .unwrap();
        assert_eq!(record.state, ElementState::Done);
        assert_eq!(record.termination, Some(Termination::Completed));
    }

    #[test]
    fn overwrite_cancels_the_conflicting_event() {
        let ego = EntityId::new(0);
        // A slow ramp that a later overwrite event cuts short.
        let mut ramp = speed_event("ramp", ego, 30.0, 0.05);
        if let Some(action) = ramp.actions.first_mut() {
            action.kind = slow_ramp(30.0);
        }
        let graph = make_graph(vec![ramp, speed_event("stop", ego, 0.0, 1.0)], 10.0);
        let mut engine = make_engine(graph);

        for _ in 0..13 {
            engine.step(0.1);
        }
        let ramp_record = engine
            .element_record(StoryElementKind::Event, "ramp")
            .unwrap();
        assert_eq!(ramp_record.termination, Some(Termination::Cancelled));
        assert_eq!(engine.snapshot(ego).unwrap().speed, 0.0);
    }

    #[test]
    fn same_tick_overwrites_resolve_in_declaration_order() {
        let ego = EntityId::new(0);
        // Both events become eligible on the same tick; the later-declared
        // one must end the tick running and the earlier cancelled.
        let mut first = speed_event("first", ego, 30.0, 0.5);
        if let Some(action) = first.actions.first_mut() {
            action.kind = slow_ramp(30.0);
        }
        let mut second = speed_event("second", ego, 0.0, 0.5);
        if let Some(action) = second.actions.first_mut() {
            action.kind = slow_ramp(0.0);
        }
        let mut engine = make_engine(make_graph(vec![first, second], 10.0));

        // Both triggers fire on the step that evaluates at t = 0.6.
        for _ in 0..7 {
            engine.step(0.1);
        }
        let first_record = engine
            .element_record(StoryElementKind::Event, "first")
            .unwrap();
        assert_eq!(first_record.state, ElementState::Done);
        assert_eq!(first_record.termination, Some(Termination::Cancelled));
        let second_record = engine
            .element_record(StoryElementKind::Event, "second")
            .unwrap();
        assert_eq!(second_record.state, ElementState::Running);
        assert_eq!(second_record.termination, None);
    }

    #[test]
    fn skip_priority_drops_the_event_on_conflict() {
        let ego = EntityId::new(0);
        let mut ramp = speed_event("ramp", ego, 30.0, 0.05);
        if let Some(action) = ramp.actions.first_mut() {
            action.kind = slow_ramp(30.0);
        }
        let mut skipped = speed_event("skipped", ego, 0.0, 1.0);
        skipped.priority = EventPriority::Skip;
        let mut engine = make_engine(make_graph(vec![ramp, skipped], 10.0));

        for _ in 0..13 {
            engine.step(0.1);
        }
        let record = engine
            .element_record(StoryElementKind::Event, "skipped")
            .unwrap();
        assert_eq!(record.state, ElementState::Skipped);
        // The ramp keeps running.
        let ramp_record = engine
            .element_record(StoryElementKind::Event, "ramp")
            .unwrap();
        assert_eq!(ramp_record.state, ElementState::Running);
    }

    #[test]
    fn following_priority_waits_for_the_conflict_to_end() {
        let ego = EntityId::new(0);
        // Two-second ramp, follower fires at t=1 and must wait.
        let mut ramp = speed_event("ramp", ego, 30.0, 0.05);
        if let Some(action) = ramp.actions.first_mut() {
            action.kind = ActionKind::Speed {
                dynamics: TransitionDynamics {
                    shape: DynamicsShape::Linear,
                    timing: Some(Timing {
                        kind: TimingKind::Time,
                        value: 2.0,
                    }),
                },
                target: SpeedTarget::Absolute { value: 30.0 },
            };
        }
        let mut follower = speed_event("follower", ego, 3.0, 1.0);
        follower.priority = EventPriority::Following;
        let mut engine = make_engine(make_graph(vec![ramp, follower], 10.0));

        for _ in 0..15 {
            engine.step(0.1);
        }
        assert_eq!(
            engine
                .element_record(StoryElementKind::Event, "follower")
                .unwrap()
                .state,
            ElementState::NotStarted
        );

        for _ in 0..15 {
            engine.step(0.1);
        }
        let record = engine
            .element_record(StoryElementKind::Event, "follower")
            .unwrap();
        assert_eq!(record.termination, Some(Termination::Completed));
        assert_eq!(engine.snapshot(ego).unwrap().speed, 3.0);
    }

    #[test]
    fn act_completes_when_all_sequences_finish() {
        let ego = EntityId::new(0);
        let mut engine = make_engine(make_graph(vec![speed_event("brake", ego, 5.0, 0.5)], 20.0));

        for _ in 0..10 {
            engine.step(0.1);
        }
        assert!(engine.completed());
        let record = engine.element_record(StoryElementKind::Act, "act").unwrap();
        assert_eq!(record.termination, Some(Termination::Completed));
    }

    #[test]
    fn abort_cancels_everything_running() {
        let ego = EntityId::new(0);
        let mut ramp = speed_event("ramp", ego, 30.0, 0.05);
        if let Some(action) = ramp.actions.first_mut() {
            action.kind = slow_ramp(30.0);
        }
        let late = speed_event("late", ego, 0.0, 1e9);
        let mut engine = make_engine(make_graph(vec![ramp, late], 10.0));

        for _ in 0..5 {
            engine.step(0.1);
        }
        engine.abort();

        assert!(engine.completed());
        let ramp_record = engine
            .element_record(StoryElementKind::Event, "ramp")
            .unwrap();
        assert_eq!(ramp_record.termination, Some(Termination::Cancelled));
        let late_record = engine
            .element_record(StoryElementKind::Event, "late")
            .unwrap();
        assert_eq!(late_record.state, ElementState::Skipped);
        let act_record = engine.element_record(StoryElementKind::Act, "act").unwrap();
        assert_eq!(act_record.termination, Some(Termination::Cancelled));
    }

    #[test]
    fn terminating_one_event_leaves_the_rest_alone() {
        let ego = EntityId::new(0);
        let mut ramp = speed_event("ramp", ego, 30.0, 0.05);
        if let Some(action) = ramp.actions.first_mut() {
            action.kind = slow_ramp(30.0);
        }
        let mut engine = make_engine(make_graph(vec![ramp], 10.0));

        for _ in 0..5 {
            engine.step(0.1);
        }
        assert!(engine.terminate_event("ramp"));
        assert!(!engine.terminate_event("missing"));

        let record = engine
            .element_record(StoryElementKind::Event, "ramp")
            .unwrap();
        assert_eq!(record.termination, Some(Termination::Cancelled));
        assert_eq!(
            engine.element_record(StoryElementKind::Act, "act").unwrap().state,
            ElementState::Running
        );
    }

    #[test]
    fn external_entities_only_move_through_reports() {
        let mut entities = EntityPool::new();
        let ego = entities.add("Ego".to_owned(), make_vehicle(true));
        let graph = ScenarioGraph {
            description: String::new(),
            road_files: RoadFiles {
                logic_path: "road.xodr".to_owned(),
                scene_graph_path: "scene.osgb".to_owned(),
            },
            entities,
            init: Vec::new(),
            stories: Vec::new(),
        };
        let mut engine = make_engine(graph);

        engine.step(0.1);
        assert_eq!(engine.snapshot(ego).unwrap().road.s, 0.0);

        engine.report_external(
            ego,
            WorldPose {
                x: 42.0,
                y: -1.75,
                ..WorldPose::default()
            },
            15.0,
        );
        engine.step(0.1);
        let snap = engine.snapshot(ego).unwrap();
        assert_eq!(snap.pose.x, 42.0);
        assert_eq!(snap.speed, 15.0);
    }

    #[test]
    fn gateway_reports_every_entity_every_tick() {
        let ego = EntityId::new(0);
        let mut engine = make_engine(make_graph(vec![speed_event("never", ego, 5.0, 1e9)], 10.0));
        engine.step(0.1);
        assert_eq!(engine.gateway().len(), 1);
        let state = engine.gateway().object(ego).unwrap();
        assert_eq!(state.name, "Ego");
        assert!((state.timestamp - 0.1).abs() < 1e-9);
    }
}
