//! End-to-end exercise of the four pipeline stages through the public API,
//! the way a caller driving the binary over JSON would: a catalog goes in,
//! a representation section and (for the SA stages) an `optimization_results`
//! block come out.

use floorplanner::io::{InputRecord, RawBlock, RawVariant};
use floorplanner::pipeline;
use serde_json::json;

fn sample_input() -> InputRecord {
    let raw = json!({
        "blocks": [
            {"name": "cpu_core", "variants": [{"width": 4.0, "height": 3.0, "is_default": true}, {"width": 3.0, "height": 4.0}]},
            {"name": "l2_cache", "variants": [{"width": 6.0, "height": 2.0, "is_default": true}]},
            {"name": "io_pads", "device_type": "analog", "variants": [{"width": 2.0, "height": 5.0, "is_default": true}]},
            {"name": "pll", "symmetry": "x", "variants": [{"width": 1.0, "height": 1.0, "is_default": true}]},
        ]
    });
    serde_json::from_value(raw).unwrap()
}

#[test]
fn build_bstar_then_anneal_further_improves_or_holds_fitness() {
    let built = pipeline::build_bstar(sample_input()).unwrap();
    assert!(built.optimization_results.is_none());
    let root = built.bstar_tree.as_ref().unwrap().root.as_ref().unwrap();
    assert_eq!(root.x_min, 0.0);
    assert_eq!(root.y_min, 0.0);

    let resumed = InputRecord {
        blocks: built.blocks.clone(),
        bstar_tree: built.bstar_tree.clone(),
        sequence_pair: None,
        extra: Default::default(),
    };
    let annealed = pipeline::anneal_bstar_stage(resumed, Some(11), &json!({}), &json!({})).unwrap();
    let results = annealed.optimization_results.unwrap();
    assert!(results.fitness_function.is_finite());
    assert!(results.actual_iterations > 0);
    assert_eq!(results.optimization_method, "simulated_annealing_contour");
}

#[test]
fn build_sp_then_anneal_round_trips_through_json() {
    let built = pipeline::build_sequence_pair(sample_input()).unwrap();
    let section = built.sequence_pair.as_ref().unwrap();
    assert_eq!(section.r_plus.len(), 4);
    assert_eq!(section.placement.len(), 4);

    let as_json = serde_json::to_string(&built).unwrap();
    let reparsed: InputRecord = serde_json::from_str(&as_json).unwrap();
    let annealed = pipeline::anneal_sequence_pair_stage(reparsed, Some(5), &json!({}), &json!({"max_iters": 50})).unwrap();
    let results = annealed.optimization_results.unwrap();
    assert_eq!(results.actual_iterations, 50);
    assert_eq!(results.optimization_method, "simulated_annealing_sequence_pair");
}

#[test]
fn sa_stage_from_scratch_with_tight_aspect_target_is_deterministic_given_seed() {
    let fitness_config = json!({"ASPECT_T": 1.0, "ASPECT_MAX": 1.2});
    let sa_config = json!({"max_iters": 200});
    let a = pipeline::anneal_bstar_stage(sample_input(), Some(99), &fitness_config, &sa_config).unwrap();
    let b = pipeline::anneal_bstar_stage(sample_input(), Some(99), &fitness_config, &sa_config).unwrap();
    assert_eq!(a.optimization_results, b.optimization_results);
}

#[test]
fn malformed_block_is_reported_as_an_error_not_a_panic() {
    let bad = InputRecord {
        blocks: vec![RawBlock {
            name: "broken".to_string(),
            device_type: None,
            symmetry: None,
            variants: vec![RawVariant { width: -1.0, height: 1.0, is_default: Some(true) }],
        }],
        bstar_tree: None,
        sequence_pair: None,
        extra: Default::default(),
    };
    let err = pipeline::build_bstar(bad).unwrap_err();
    assert!(err.to_string().contains("malformed variant"));
}

#[test]
fn empty_catalog_is_rejected_by_every_stage() {
    let empty = InputRecord { blocks: vec![], bstar_tree: None, sequence_pair: None, extra: Default::default() };
    assert!(pipeline::build_bstar(empty.clone()).is_err());
    assert!(pipeline::build_sequence_pair(empty.clone()).is_err());
    assert!(pipeline::anneal_bstar_stage(empty.clone(), Some(1), &json!({}), &json!({})).is_err());
    assert!(pipeline::anneal_sequence_pair_stage(empty, Some(1), &json!({}), &json!({})).is_err());
}
