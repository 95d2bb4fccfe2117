//! External interface records (`spec.md` §6): the JSON-shaped input, output
//! and error records exchanged over stdin/stdout by each pipeline stage.
//!
//! These are the only dynamically-typed entry points into the crate; every
//! other module works with the statically typed structures in [`crate::catalog`],
//! [`crate::placement`], [`crate::bstar`] and [`crate::sequence_pair`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One shape a block may assume, as given on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawVariant {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub is_default: Option<bool>,
}

/// A block as given on the wire: opaque `device_type`/`symmetry` attributes
/// are carried through untouched (`spec.md` §3: "preserved as opaque
/// attributes but not optimized").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBlock {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symmetry: Option<Value>,
    pub variants: Vec<RawVariant>,
}

/// One node of a decoded B*-tree, as given or produced on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BStarTreeNodeRecord {
    pub name: String,
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
    #[serde(default, deserialize_with = "deserialize_optional_child", skip_serializing_if = "Option::is_none")]
    pub x_child: Option<Box<BStarTreeNodeRecord>>,
    #[serde(default, deserialize_with = "deserialize_optional_child", skip_serializing_if = "Option::is_none")]
    pub y_child: Option<Box<BStarTreeNodeRecord>>,
}

/// Accepts either an absent field, a JSON `null`, an empty object `{}`, or a
/// fully-formed child node (mirrors the `{}`-as-absent convention used by
/// the reference generator this crate supersedes).
fn deserialize_optional_child<'de, D>(deserializer: D) -> Result<Option<Box<BStarTreeNodeRecord>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(ref map)) if !map.contains_key("name") => Ok(None),
        Some(other) => {
            let node: BStarTreeNodeRecord = serde_json::from_value(other).map_err(serde::de::Error::custom)?;
            Ok(Some(Box::new(node)))
        }
    }
}

/// Summary metadata attached to a constructed (not-yet-annealed) B*-tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementInfo {
    pub total_blocks: usize,
    pub total_width: f64,
    pub total_height: f64,
    pub placement_method: String,
}

/// The `bstar_tree` section of an input or output record.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BStarTreeSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<BStarTreeNodeRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement_info: Option<PlacementInfo>,
}

/// One block's placed rectangle as carried inside a `sequence_pair` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPlacedRect {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

/// The `sequence_pair` section of an input or output record.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SequencePairSection {
    pub r_plus: Vec<String>,
    pub r_minus: Vec<String>,
    #[serde(default)]
    pub placement: BTreeMap<String, RawPlacedRect>,
}

/// The final `optimization_results` block (component C7).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptimizationResults {
    pub fitness_function: f64,
    pub total_area: f64,
    pub used_area: f64,
    pub dead_space: f64,
    pub dead_space_percentage: f64,
    pub aspect_ratio: f64,
    pub placement_width: f64,
    pub placement_height: f64,
    pub actual_iterations: u64,
    pub optimization_method: String,
}

/// Input record consumed by every pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InputRecord {
    pub blocks: Vec<RawBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bstar_tree: Option<BStarTreeSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_pair: Option<SequencePairSection>,
    /// Any other top-level fields the caller attached; echoed back untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Output record produced by every pipeline stage on success: the input,
/// with the relevant representation section overwritten and
/// `optimization_results` attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputRecord {
    pub blocks: Vec<RawBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bstar_tree: Option<BStarTreeSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_pair: Option<SequencePairSection>,
    /// Present only for the SA stages (3, 4); absent for the two `build-*`
    /// stages, which only attach their representation section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimization_results: Option<OptimizationResults>,
    /// Set only when the SA driver stopped early via cooperative
    /// cancellation (`spec.md` §7).
    #[serde(default, skip_serializing_if = "is_false")]
    pub canceled: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Error record emitted on fatal failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub error: String,
}

impl ErrorRecord {
    pub fn new(message: impl Into<String>) -> Self {
        Self { error: message.into() }
    }
}
