//! Result Assembler (component C7): rounds metrics to two decimals and
//! assembles the `optimization_results` block attached to every output
//! record (`spec.md` §4.7).

use crate::evaluator::Metrics;
use crate::io::OptimizationResults;

/// Rounds to two decimal places. Internal math stays full-precision
/// throughout the engines and the SA driver; rounding happens only here, at
/// the output boundary (`spec.md` §9).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Builds the `optimization_results` block. `metrics` is `None` for a
/// degenerate placement, in which case the geometric fields are reported as
/// zero alongside the (necessarily infinite, pre-rounding) fitness.
pub fn assemble(fitness: f64, metrics: Option<Metrics>, iterations: u64, method: &str) -> OptimizationResults {
    let m = metrics.unwrap_or(Metrics {
        total_area: 0.0,
        used_area: 0.0,
        dead_space: 0.0,
        dead_ratio: 0.0,
        aspect_ratio: 0.0,
        width: 0.0,
        height: 0.0,
    });
    OptimizationResults {
        fitness_function: round2(fitness),
        total_area: round2(m.total_area),
        used_area: round2(m.used_area),
        dead_space: round2(m.dead_space),
        dead_space_percentage: round2(m.dead_ratio * 100.0),
        aspect_ratio: round2(m.aspect_ratio),
        placement_width: round2(m.width),
        placement_height: round2(m.height),
        actual_iterations: iterations,
        optimization_method: method.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(round2(1.005), 1.0); // binary float rounding, not exact-decimal
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(1.236), 1.24);
    }

    #[test]
    fn degenerate_metrics_report_zeroed_geometry() {
        let results = assemble(f64::INFINITY, None, 3, "simulated_annealing_contour");
        assert_eq!(results.total_area, 0.0);
        assert_eq!(results.actual_iterations, 3);
        assert_eq!(results.optimization_method, "simulated_annealing_contour");
    }
}
