//! Benchmark statistics.
//!
//! Error of a result is `value - reference`, where the reference is the
//! result's own or else the benchmark's `reference_value`. Results with no
//! reference at all are skipped.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::{EntityKind, KnowledgeGraph};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkStats {
    pub benchmark_id: String,
    pub name: String,
    pub count: usize,
    pub mean_error: f64,
    pub mean_abs_error: f64,
    pub rmse: f64,
    pub max_abs_error: f64,
    pub median_abs_error: f64,
    pub best_method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodStats {
    pub method_id: String,
    pub benchmarks: usize,
    pub results: usize,
    pub mean_abs_error: f64,
    pub rmse: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsReport {
    pub benchmarks: Vec<BenchmarkStats>,
    pub methods: Vec<MethodStats>,
    pub skipped_results: usize,
}

/// Compute per-benchmark and per-method error statistics.
pub fn compute(graph: &KnowledgeGraph) -> StatsReport {
    let mut report = StatsReport::default();
    let mut per_method: BTreeMap<&str, (BTreeSet<&str>, Vec<f64>)> = BTreeMap::new();

    for bench in graph.collection(EntityKind::Benchmark) {
        let mut errors: Vec<(&str, f64)> = Vec::new();
        for result in &bench.results {
            match result.reference.or(bench.reference_value) {
                Some(reference) if result.value.is_finite() && reference.is_finite() => {
                    errors.push((result.method.as_str(), result.value - reference));
                }
                _ => report.skipped_results += 1,
            }
        }
        if errors.is_empty() {
            continue;
        }

        for (method, err) in &errors {
            let entry = per_method.entry(*method).or_default();
            entry.0.insert(bench.id.as_str());
            entry.1.push(*err);
        }

        let signed: Vec<f64> = errors.iter().map(|(_, e)| *e).collect();
        let abs: Vec<f64> = signed.iter().map(|e| e.abs()).collect();
        let best_method = errors
            .iter()
            .min_by(|a, b| a.1.abs().total_cmp(&b.1.abs()).then_with(|| a.0.cmp(&b.0)))
            .map(|(m, _)| m.to_string());

        report.benchmarks.push(BenchmarkStats {
            benchmark_id: bench.id.clone(),
            name: bench.name.clone(),
            count: signed.len(),
            mean_error: mean(&signed),
            mean_abs_error: mean(&abs),
            rmse: rmse(&signed),
            max_abs_error: abs.iter().copied().fold(0.0, f64::max),
            median_abs_error: median(&abs),
            best_method,
        });
    }

    report.methods = per_method
        .into_iter()
        .map(|(method, (benches, errors))| {
            let abs: Vec<f64> = errors.iter().map(|e| e.abs()).collect();
            MethodStats {
                method_id: method.to_string(),
                benchmarks: benches.len(),
                results: errors.len(),
                mean_abs_error: mean(&abs),
                rmse: rmse(&errors),
            }
        })
        .collect();
    report.methods.sort_by(|a, b| {
        a.mean_abs_error
            .total_cmp(&b.mean_abs_error)
            .then_with(|| a.method_id.cmp(&b.method_id))
    });

    report
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn rmse(errors: &[f64]) -> f64 {
    if errors.is_empty() {
        return 0.0;
    }
    (errors.iter().map(|e| e * e).sum::<f64>() / errors.len() as f64).sqrt()
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BenchmarkResult, Entity};

    fn result(method: &str, value: f64, reference: Option<f64>) -> BenchmarkResult {
        BenchmarkResult { method: method.into(), value, reference, unit: None }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_empty_graph() {
        let report = compute(&KnowledgeGraph::default());
        assert!(report.benchmarks.is_empty());
        assert!(report.methods.is_empty());
    }

    #[test]
    fn test_benchmark_and_method_stats() {
        let mut graph = KnowledgeGraph::default();

        let mut g2 = Entity::new("benchmark.g2", "G2");
        g2.reference_value = Some(10.0);
        g2.results = vec![
            result("method.dft", 12.0, None),
            result("method.hf", 7.0, None),
            result("method.ccsd", 10.5, None),
        ];
        graph.insert(g2).unwrap();

        let mut s22 = Entity::new("benchmark.s22", "S22");
        s22.results = vec![
            result("method.dft", 1.0, Some(2.0)),
            result("method.hf", 5.0, None),
        ];
        graph.insert(s22).unwrap();

        let report = compute(&graph);
        assert_eq!(report.skipped_results, 1);
        assert_eq!(report.benchmarks.len(), 2);

        let g2 = &report.benchmarks[0];
        assert_eq!(g2.count, 3);
        assert!(approx(g2.mean_error, (2.0 - 3.0 + 0.5) / 3.0));
        assert!(approx(g2.mean_abs_error, 5.5 / 3.0));
        assert!(approx(g2.rmse, ((4.0 + 9.0 + 0.25) / 3.0f64).sqrt()));
        assert!(approx(g2.max_abs_error, 3.0));
        assert!(approx(g2.median_abs_error, 2.0));
        assert_eq!(g2.best_method.as_deref(), Some("method.ccsd"));

        let ids: Vec<&str> = report.methods.iter().map(|m| m.method_id.as_str()).collect();
        assert_eq!(ids, vec!["method.ccsd", "method.dft", "method.hf"]);
        let dft = &report.methods[1];
        assert_eq!(dft.benchmarks, 2);
        assert!(approx(dft.mean_abs_error, 1.5));
    }

    #[test]
    fn test_ties_break_by_method_id() {
        let mut w4 = Entity::new("benchmark.w4_11", "W4-11");
        w4.reference_value = Some(0.0);
        w4.results = vec![
            result("method.pbe0", 1.0, None),
            result("method.b3lyp", -1.0, None),
            result("method.m06", 1.0, None),
        ];
        let mut graph = KnowledgeGraph::default();
        graph.insert(w4).unwrap();

        let report = compute(&graph);
        assert_eq!(report.benchmarks[0].best_method.as_deref(), Some("method.b3lyp"));
        let ids: Vec<&str> = report.methods.iter().map(|m| m.method_id.as_str()).collect();
        assert_eq!(ids, vec!["method.b3lyp", "method.m06", "method.pbe0"]);
    }

    #[test]
    fn test_median_even() {
        assert!(approx(median(&[4.0, 1.0, 3.0, 2.0]), 2.5));
    }
}
