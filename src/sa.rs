//! Simulated-Annealing Driver (component C6): geometric cooling schedule,
//! per-representation neighbor generation, accept/reject, and best-so-far
//! tracking (`spec.md` §4.6).
//!
//! The driver is written twice, once per representation, rather than
//! abstracted behind a shared trait: the two engines have distinct move
//! sets, distinct default schedules, and distinct fitness conventions, and
//! forcing them through one generic loop would only obscure that. This
//! mirrors the source material's own choice of two independent optimizer
//! scripts rather than one parameterized one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::Rng;
use serde_json::Value;

use crate::bstar::{BStarMove, BStarTree};
use crate::catalog::Catalog;
use crate::error::Result;
use crate::evaluator::{compute_metrics, AspectConvention, BStarFitnessConfig, SequencePairFitnessConfig};
use crate::placement::Placement;
use crate::sequence_pair::{SequencePair, SequencePairMove};

/// Cooperative cancellation flag, checked once per SA iteration
/// (`spec.md` §5). Cheap to clone and share across threads; the driver
/// itself never spawns any.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Geometric cooling schedule parameters (`spec.md` §4.6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaParams {
    pub t0: f64,
    pub tf: f64,
    pub alpha: f64,
    pub max_iters: u64,
}

impl SaParams {
    pub fn bstar_default() -> Self {
        Self { t0: 1000.0, tf: 0.1, alpha: 0.95, max_iters: 500 }
    }

    pub fn sequence_pair_default() -> Self {
        Self { t0: 1000.0, tf: 0.5, alpha: 0.90, max_iters: 1000 }
    }

    pub fn from_value(value: &Value, default: SaParams) -> SaParams {
        let mut params = default;
        if let Some(obj) = value.as_object() {
            if let Some(v) = obj.get("T0").and_then(Value::as_f64) {
                params.t0 = v;
            }
            if let Some(v) = obj.get("Tf").and_then(Value::as_f64) {
                params.tf = v;
            }
            if let Some(v) = obj.get("alpha").and_then(Value::as_f64) {
                params.alpha = v;
            }
            if let Some(v) = obj.get("max_iters").and_then(Value::as_u64) {
                params.max_iters = v;
            }
        }
        params
    }
}

/// Result of an SA run: the best-so-far state, its decoded placement and
/// fitness, the iteration count actually reached, and whether the run ended
/// via cooperative cancellation rather than the cooling schedule.
#[derive(Debug, Clone)]
pub struct SaOutcome<State> {
    pub state: State,
    pub placement: Placement,
    pub fitness: f64,
    pub iterations: u64,
    pub canceled: bool,
}

fn accept(new_fit: f64, current_fit: f64, temperature: f64, rng: &mut impl Rng) -> bool {
    if new_fit < current_fit {
        return true;
    }
    if temperature <= 0.0 || !new_fit.is_finite() {
        return false;
    }
    let delta = new_fit - current_fit;
    rng.gen::<f64>() < (-delta / temperature).exp()
}

/// Anneal a B*-tree starting state. Candidate decode failures are demoted
/// to `+∞` fitness and rejected rather than propagated (`spec.md` §4.6,
/// §7); only construction-time errors from a malformed move (which would
/// indicate a catalog/tree mismatch, not a numerical degeneracy) propagate.
pub fn anneal_bstar(
    initial: BStarTree,
    catalog: &Catalog,
    fitness_cfg: &BStarFitnessConfig,
    params: &SaParams,
    rng: &mut impl Rng,
    cancel: &CancellationToken,
) -> Result<SaOutcome<BStarTree>> {
    let mut current = initial;
    let mut current_placement = current.decode(catalog)?;
    let mut current_fit = fitness_cfg.fitness(compute_metrics(&current_placement, AspectConvention::MaxOverMin));

    let mut best = current.clone();
    let mut best_placement = current_placement.clone();
    let mut best_fit = current_fit;

    let mut temperature = params.t0;
    let mut iterations = 0u64;
    let mut canceled = false;

    while temperature > params.tf && iterations < params.max_iters {
        if cancel.is_canceled() {
            canceled = true;
            tracing::debug!(iterations, "bstar SA canceled");
            break;
        }

        let mut candidate = current.clone();
        let mv = BStarMove::random(rng);
        candidate.apply_move(mv, catalog, rng)?;
        let (new_fit, new_placement) = match candidate.decode(catalog) {
            Ok(placement) => {
                let fit = fitness_cfg.fitness(compute_metrics(&placement, AspectConvention::MaxOverMin));
                (fit, Some(placement))
            }
            Err(_) => (f64::INFINITY, None),
        };

        let accepted = accept(new_fit, current_fit, temperature, rng);
        if accepted {
            current = candidate;
            current_fit = new_fit;
            if let Some(placement) = new_placement {
                current_placement = placement;
            }
            if current_fit < best_fit {
                best = current.clone();
                best_fit = current_fit;
                best_placement = current_placement.clone();
            }
        }
        tracing::debug!(iterations, temperature, ?mv, new_fit, accepted, best_fit, "bstar SA step");

        temperature *= params.alpha;
        iterations += 1;
    }

    Ok(SaOutcome { state: best, placement: best_placement, fitness: best_fit, iterations, canceled })
}

/// Anneal a Sequence-Pair starting state. Same non-fatal decode-failure
/// handling as [`anneal_bstar`].
pub fn anneal_sequence_pair(
    initial: SequencePair,
    catalog: &Catalog,
    fitness_cfg: &SequencePairFitnessConfig,
    params: &SaParams,
    rng: &mut impl Rng,
    cancel: &CancellationToken,
) -> Result<SaOutcome<SequencePair>> {
    let mut current = initial;
    let mut current_placement = current.decode(catalog)?;
    let mut current_fit = fitness_cfg.fitness(compute_metrics(&current_placement, AspectConvention::WidthOverHeight));

    let mut best = current.clone();
    let mut best_placement = current_placement.clone();
    let mut best_fit = current_fit;

    let mut temperature = params.t0;
    let mut iterations = 0u64;
    let mut canceled = false;

    while temperature > params.tf && iterations < params.max_iters {
        if cancel.is_canceled() {
            canceled = true;
            tracing::debug!(iterations, "sequence-pair SA canceled");
            break;
        }

        let mut candidate = current.clone();
        let mv = SequencePairMove::random(rng);
        candidate.apply_move(mv, catalog, rng)?;
        let (new_fit, new_placement) = match candidate.decode(catalog) {
            Ok(placement) => {
                let fit = fitness_cfg.fitness(compute_metrics(&placement, AspectConvention::WidthOverHeight));
                (fit, Some(placement))
            }
            Err(_) => (f64::INFINITY, None),
        };

        let accepted = accept(new_fit, current_fit, temperature, rng);
        if accepted {
            current = candidate;
            current_fit = new_fit;
            if let Some(placement) = new_placement {
                current_placement = placement;
            }
            if current_fit < best_fit {
                best = current.clone();
                best_fit = current_fit;
                best_placement = current_placement.clone();
            }
        }
        tracing::debug!(iterations, temperature, ?mv, new_fit, accepted, best_fit, "sequence-pair SA step");

        temperature *= params.alpha;
        iterations += 1;
    }

    Ok(SaOutcome { state: best, placement: best_placement, fitness: best_fit, iterations, canceled })
}
