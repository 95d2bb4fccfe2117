//! Evaluator (component C5): bounding box, used area, dead-space ratio,
//! aspect ratio, and the composite fitness functions the SA driver
//! minimizes. Each engine uses its own aspect-ratio convention and fitness
//! formula (`spec.md` §4.5).

use serde_json::Value;

use crate::placement::Placement;

/// Which aspect-ratio convention a fitness formula uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectConvention {
    /// `max(W,H) / min(W,H)`, always ≥ 1 (used by the B*-tree fitness).
    MaxOverMin,
    /// `W / H` directly (used by the Sequence-Pair fitness).
    WidthOverHeight,
}

/// Geometric measurements of a decoded placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub total_area: f64,
    pub used_area: f64,
    pub dead_space: f64,
    /// In `[0, 1]`.
    pub dead_ratio: f64,
    pub aspect_ratio: f64,
    pub width: f64,
    pub height: f64,
}

/// Computes [`Metrics`] for a placement, or `None` for a degenerate
/// placement (`W = 0` or `H = 0`, or no blocks at all). Callers map `None`
/// to `+∞` fitness (`spec.md` §4.5).
pub fn compute_metrics(placement: &Placement, convention: AspectConvention) -> Option<Metrics> {
    if placement.is_empty() {
        return None;
    }
    let width = placement.bounding_width();
    let height = placement.bounding_height();
    if width <= 0.0 || height <= 0.0 {
        return None;
    }
    let total_area = width * height;
    let used_area: f64 = placement.iter().map(|(_, p)| p.area()).sum();
    let dead_space = (total_area - used_area).max(0.0);
    let dead_ratio = if total_area > 0.0 { dead_space / total_area } else { 0.0 };
    let aspect_ratio = match convention {
        AspectConvention::MaxOverMin => width.max(height) / width.min(height),
        AspectConvention::WidthOverHeight => width / height,
    };
    Some(Metrics { total_area, used_area, dead_space, dead_ratio, aspect_ratio, width, height })
}

/// Fitness configuration for the B*-tree engine. Defaults per `spec.md`
/// §4.5.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BStarFitnessConfig {
    pub area_w: f64,
    pub dead_w: f64,
    pub aspect_w: f64,
    pub aspect_t: f64,
    pub aspect_max: f64,
    pub aspect_p: f64,
}

impl Default for BStarFitnessConfig {
    fn default() -> Self {
        Self { area_w: 100.0, dead_w: 10.0, aspect_w: 10.0, aspect_t: 1.0, aspect_max: 2.0, aspect_p: 1000.0 }
    }
}

impl BStarFitnessConfig {
    /// Overrides individual fields from a JSON object; unknown keys are
    /// ignored, missing keys keep the default. Same permissive
    /// `serde_json::Value` config pattern used for CLI config blobs
    /// throughout this crate's dependency stack.
    pub fn from_value(value: &Value) -> Self {
        let mut cfg = Self::default();
        if let Some(obj) = value.as_object() {
            if let Some(v) = obj.get("AREA_W").and_then(Value::as_f64) {
                cfg.area_w = v;
            }
            if let Some(v) = obj.get("DEAD_W").and_then(Value::as_f64) {
                cfg.dead_w = v;
            }
            if let Some(v) = obj.get("ASPECT_W").and_then(Value::as_f64) {
                cfg.aspect_w = v;
            }
            if let Some(v) = obj.get("ASPECT_T").and_then(Value::as_f64) {
                cfg.aspect_t = v;
            }
            if let Some(v) = obj.get("ASPECT_MAX").and_then(Value::as_f64) {
                cfg.aspect_max = v;
            }
            if let Some(v) = obj.get("ASPECT_P").and_then(Value::as_f64) {
                cfg.aspect_p = v;
            }
        }
        cfg
    }

    /// `fitness = AREA_W·total_area + aspect_term + DEAD_W·dead_ratio`,
    /// where `aspect_term` is `ASPECT_P·(aspect − ASPECT_MAX)` past the cap
    /// or `ASPECT_W·|aspect − ASPECT_T|` below it.
    pub fn fitness(&self, metrics: Option<Metrics>) -> f64 {
        let Some(m) = metrics else { return f64::INFINITY };
        let aspect_term = if m.aspect_ratio > self.aspect_max {
            self.aspect_p * (m.aspect_ratio - self.aspect_max)
        } else {
            self.aspect_w * (m.aspect_ratio - self.aspect_t).abs()
        };
        self.area_w * m.total_area + aspect_term + self.dead_w * m.dead_ratio
    }
}

/// Fitness configuration for the Sequence-Pair engine. Defaults per
/// `spec.md` §4.5.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequencePairFitnessConfig {
    pub area_w: f64,
    pub dead_w: f64,
    pub aspect_w: f64,
    pub aspect_t: f64,
}

impl Default for SequencePairFitnessConfig {
    fn default() -> Self {
        Self { area_w: 10.0, dead_w: 100.0, aspect_w: 10.0, aspect_t: 1.0 }
    }
}

impl SequencePairFitnessConfig {
    pub fn from_value(value: &Value) -> Self {
        let mut cfg = Self::default();
        if let Some(obj) = value.as_object() {
            if let Some(v) = obj.get("AREA_W").and_then(Value::as_f64) {
                cfg.area_w = v;
            }
            if let Some(v) = obj.get("DEAD_W").and_then(Value::as_f64) {
                cfg.dead_w = v;
            }
            if let Some(v) = obj.get("ASPECT_W").and_then(Value::as_f64) {
                cfg.aspect_w = v;
            }
            if let Some(v) = obj.get("ASPECT_T").and_then(Value::as_f64) {
                cfg.aspect_t = v;
            }
        }
        cfg
    }

    /// `fitness = AREA_W·total_area + DEAD_W·(dead_ratio·100) +
    /// ASPECT_W·|(W/H) − ASPECT_T|`.
    pub fn fitness(&self, metrics: Option<Metrics>) -> f64 {
        let Some(m) = metrics else { return f64::INFINITY };
        self.area_w * m.total_area + self.dead_w * (m.dead_ratio * 100.0) + self.aspect_w * (m.aspect_ratio - self.aspect_t).abs()
    }
}
