//! The four stdin→stdout pipeline stages (`spec.md` §6): build an initial
//! B*-tree or Sequence-Pair from a block catalog, or anneal an existing one.
//! Each stage is a thin composition of the typed engines in
//! [`crate::bstar`]/[`crate::sequence_pair`]/[`crate::sa`] over the wire
//! records in [`crate::io`].

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use serde_json::Value;

use crate::bstar::BStarTree;
use crate::catalog::Catalog;
use crate::error::Result;
use crate::evaluator::{compute_metrics, AspectConvention, BStarFitnessConfig, SequencePairFitnessConfig};
use crate::io::{BStarTreeSection, InputRecord, OutputRecord, PlacementInfo};
use crate::result::assemble;
use crate::sa::{anneal_bstar, anneal_sequence_pair, CancellationToken, SaParams};
use crate::sequence_pair::SequencePair;

fn seeded_rng(seed: Option<u64>) -> Xoshiro256StarStar {
    match seed {
        Some(seed) => Xoshiro256StarStar::seed_from_u64(seed),
        None => Xoshiro256StarStar::from_entropy(),
    }
}

/// Stage 1: construct an initial B*-tree + contour decode from the block
/// catalog. Idempotent: running it again on its own output reconstructs the
/// same tree from scratch (it ignores any existing `bstar_tree` section).
pub fn build_bstar(input: InputRecord) -> Result<OutputRecord> {
    let catalog = Catalog::load(&input.blocks)?;
    tracing::debug!(blocks = catalog.len(), "building initial B*-tree");
    let tree = BStarTree::construct(&catalog)?;
    let placement = tree.decode(&catalog)?;
    let root_record = tree.to_record(&placement)?;
    let placement_info = PlacementInfo {
        total_blocks: placement.len(),
        total_width: crate::result::round2(placement.bounding_width()),
        total_height: crate::result::round2(placement.bounding_height()),
        placement_method: "contour_based_bstar_tree".to_string(),
    };

    Ok(OutputRecord {
        blocks: input.blocks,
        bstar_tree: Some(BStarTreeSection { root: Some(root_record), placement_info: Some(placement_info) }),
        sequence_pair: input.sequence_pair,
        optimization_results: None,
        canceled: false,
        extra: input.extra,
    })
}

/// Stage 2: construct an initial Sequence-Pair + O(n²) decode from the
/// block catalog.
pub fn build_sequence_pair(input: InputRecord) -> Result<OutputRecord> {
    let catalog = Catalog::load(&input.blocks)?;
    tracing::debug!(blocks = catalog.len(), "building initial sequence pair");
    let sp = SequencePair::construct(&catalog)?;
    let placement = sp.decode(&catalog)?;
    let section = sp.to_section(&placement)?;

    Ok(OutputRecord {
        blocks: input.blocks,
        bstar_tree: input.bstar_tree,
        sequence_pair: Some(section),
        optimization_results: None,
        canceled: false,
        extra: input.extra,
    })
}

/// Stage 3: anneal a B*-tree. Resumes from `input.bstar_tree.root` when
/// present (a prior `build-bstar` or `sa-bstar` output); otherwise builds
/// the initial tree from scratch, per `spec.md` §6's supplemental behavior
/// grounded in the original SA script reusing a prior tree when given one.
pub fn anneal_bstar_stage(input: InputRecord, seed: Option<u64>, fitness_config: &Value, sa_config: &Value) -> Result<OutputRecord> {
    let catalog = Catalog::load(&input.blocks)?;
    let starting_tree = match input.bstar_tree.as_ref().and_then(|s| s.root.as_ref()) {
        Some(root) => BStarTree::from_record(root, &catalog)?,
        None => BStarTree::construct(&catalog)?,
    };

    let fitness_cfg = BStarFitnessConfig::from_value(fitness_config);
    let params = SaParams::from_value(sa_config, SaParams::bstar_default());
    let mut rng = seeded_rng(seed);
    let cancel = CancellationToken::new();
    tracing::debug!(blocks = catalog.len(), t0 = params.t0, alpha = params.alpha, "annealing B*-tree");
    let outcome = anneal_bstar(starting_tree, &catalog, &fitness_cfg, &params, &mut rng, &cancel)?;
    tracing::debug!(fitness = outcome.fitness, iterations = outcome.iterations, "B*-tree SA finished");

    let root_record = outcome.state.to_record(&outcome.placement)?;
    let placement_info = PlacementInfo {
        total_blocks: outcome.placement.len(),
        total_width: crate::result::round2(outcome.placement.bounding_width()),
        total_height: crate::result::round2(outcome.placement.bounding_height()),
        placement_method: "contour_based_bstar_tree".to_string(),
    };
    let metrics = compute_metrics(&outcome.placement, AspectConvention::MaxOverMin);
    let optimization_results = assemble(outcome.fitness, metrics, outcome.iterations, "simulated_annealing_contour");

    Ok(OutputRecord {
        blocks: input.blocks,
        bstar_tree: Some(BStarTreeSection { root: Some(root_record), placement_info: Some(placement_info) }),
        sequence_pair: input.sequence_pair,
        optimization_results: Some(optimization_results),
        canceled: outcome.canceled,
        extra: input.extra,
    })
}

/// Stage 4: anneal a Sequence-Pair. Resumes from `input.sequence_pair` when
/// present and consistent with the catalog; otherwise builds the initial
/// pair from scratch.
pub fn anneal_sequence_pair_stage(
    input: InputRecord,
    seed: Option<u64>,
    fitness_config: &Value,
    sa_config: &Value,
) -> Result<OutputRecord> {
    let catalog = Catalog::load(&input.blocks)?;
    let starting_sp = match input.sequence_pair.as_ref() {
        Some(section) if section.r_plus.len() == catalog.len() => SequencePair::from_section(section, &catalog)?,
        _ => SequencePair::construct(&catalog)?,
    };

    let fitness_cfg = SequencePairFitnessConfig::from_value(fitness_config);
    let params = SaParams::from_value(sa_config, SaParams::sequence_pair_default());
    let mut rng = seeded_rng(seed);
    let cancel = CancellationToken::new();
    tracing::debug!(blocks = catalog.len(), t0 = params.t0, alpha = params.alpha, "annealing sequence pair");
    let outcome = anneal_sequence_pair(starting_sp, &catalog, &fitness_cfg, &params, &mut rng, &cancel)?;
    tracing::debug!(fitness = outcome.fitness, iterations = outcome.iterations, "sequence-pair SA finished");

    let section = outcome.state.to_section(&outcome.placement)?;
    let metrics = compute_metrics(&outcome.placement, AspectConvention::WidthOverHeight);
    let optimization_results = assemble(outcome.fitness, metrics, outcome.iterations, "simulated_annealing_sequence_pair");

    Ok(OutputRecord {
        blocks: input.blocks,
        bstar_tree: input.bstar_tree,
        sequence_pair: Some(section),
        optimization_results: Some(optimization_results),
        canceled: outcome.canceled,
        extra: input.extra,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{RawBlock, RawVariant};

    fn input_with_blocks(n: usize) -> InputRecord {
        let blocks = (0..n)
            .map(|i| RawBlock {
                name: format!("B{i}"),
                device_type: None,
                symmetry: None,
                variants: vec![RawVariant { width: 2.0 + (i as f64 % 3.0), height: 1.0 + (i as f64 % 2.0), is_default: Some(true) }],
            })
            .collect();
        InputRecord { blocks, bstar_tree: None, sequence_pair: None, extra: Default::default() }
    }

    #[test]
    fn build_bstar_produces_root_and_no_optimization_results() {
        let output = build_bstar(input_with_blocks(5)).unwrap();
        assert!(output.bstar_tree.unwrap().root.is_some());
        assert!(output.optimization_results.is_none());
    }

    #[test]
    fn build_sp_produces_section_and_no_optimization_results() {
        let output = build_sequence_pair(input_with_blocks(5)).unwrap();
        let sp = output.sequence_pair.unwrap();
        assert_eq!(sp.r_plus.len(), 5);
        assert!(output.optimization_results.is_none());
    }

    #[test]
    fn sa_bstar_from_scratch_is_deterministic() {
        let a = anneal_bstar_stage(input_with_blocks(6), Some(1), &Value::Null, &Value::Null).unwrap();
        let b = anneal_bstar_stage(input_with_blocks(6), Some(1), &Value::Null, &Value::Null).unwrap();
        assert_eq!(a.optimization_results, b.optimization_results);
    }

    #[test]
    fn sa_bstar_resumes_from_prior_build() {
        let built = build_bstar(input_with_blocks(5)).unwrap();
        let resumed = InputRecord {
            blocks: built.blocks.clone(),
            bstar_tree: built.bstar_tree.clone(),
            sequence_pair: None,
            extra: Default::default(),
        };
        let outcome = anneal_bstar_stage(resumed, Some(3), &Value::Null, &Value::Null).unwrap();
        assert!(outcome.optimization_results.unwrap().fitness_function.is_finite());
    }

    #[test]
    fn sa_sequence_pair_resumes_from_prior_build() {
        let built = build_sequence_pair(input_with_blocks(5)).unwrap();
        let resumed = InputRecord {
            blocks: built.blocks.clone(),
            bstar_tree: None,
            sequence_pair: built.sequence_pair.clone(),
            extra: Default::default(),
        };
        let outcome = anneal_sequence_pair_stage(resumed, Some(9), &Value::Null, &Value::Null).unwrap();
        assert_eq!(outcome.optimization_results.unwrap().optimization_method, "simulated_annealing_sequence_pair");
    }

    #[test]
    fn invalid_input_is_an_error_not_a_panic() {
        let empty = InputRecord { blocks: vec![], bstar_tree: None, sequence_pair: None, extra: Default::default() };
        assert!(build_bstar(empty).is_err());
    }
}
