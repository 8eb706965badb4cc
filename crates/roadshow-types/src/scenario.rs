//! The fully parsed scenario document.

use serde::{Deserialize, Serialize};

use crate::action::ActionSpec;
use crate::entity::EntityPool;
use crate::story::Story;

/// Road-network file references from the document header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadFiles {
    /// Path to the road-logic file. Required; the load fails without it.
    pub logic_path: String,
    /// Path to the scene-graph model file. Defaulted to a sibling
    /// `models/` directory when the document omits it.
    pub scene_graph_path: String,
}

/// Everything the reader produces: the complete document model.
///
/// The graph is immutable after load. The engine builds its runtime state
/// (entity kinematics, story-element state machines) beside it and only
/// reads the graph during execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioGraph {
    /// Free-text description from the document header.
    pub description: String,
    /// Road-network file references.
    pub road_files: RoadFiles,
    /// All declared entities.
    pub entities: EntityPool,
    /// Private actions applied once before the first regular step.
    pub init: Vec<ActionSpec>,
    /// Stories in declaration order.
    pub stories: Vec<Story>,
}
