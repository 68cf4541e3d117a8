//! Pipeline benchmark: synthetic production log → footprints → full report.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use footprint_analyzer::aggregate::{Aggregator, GroupBy};
use footprint_analyzer::config::{AnalysisConfig, IngestConfig};
use footprint_analyzer::eventlog::RawRecord;
use footprint_analyzer::footprints::FootprintExtractor;
use footprint_analyzer::kpi::KpiCalculator;
use footprint_analyzer::pipeline::Pipeline;
use serde_json::json;

const ROUTING: [&str; 6] = ["0010", "0020", "0030", "0040", "0050", "0060"];

fn make_log(cases: usize) -> Vec<RawRecord> {
    let mut out = Vec::with_capacity(cases * ROUTING.len());
    for c in 0..cases {
        let mut ts: i64 = (c as i64) * 600_000;
        for (i, op) in ROUTING.iter().enumerate() {
            ts += 60_000 * (1 + ((c * 7 + i * 13) % 17) as i64);
            out.push(
                json!({
                    "case_id": format!("K{:05}", c),
                    "activity": op,
                    "timestamp": ts,
                    "resource": format!("M{}", (c + i) % 4),
                    "OEE": 0.5 + ((c + i) % 5) as f64 / 10.0,
                })
                .as_object()
                .cloned()
                .unwrap(),
            );
        }
    }
    out
}

fn bench_extraction(c: &mut Criterion) {
    let extractor = FootprintExtractor::new(IngestConfig::default());
    let records = make_log(1000);

    c.bench_function("extract_1000_cases", |b| {
        b.iter(|| black_box(extractor.extract_records(black_box(&records))))
    });
}

fn bench_aggregation(c: &mut Criterion) {
    let extraction = FootprintExtractor::new(IngestConfig::default()).extract_records(&make_log(1000));
    let calc = KpiCalculator::new(&extraction.log);
    let aggregator = Aggregator::new(GroupBy::Resource, 3600);

    c.bench_function("aggregate_by_resource_1000_cases", |b| {
        b.iter(|| black_box(aggregator.aggregate(black_box(&extraction.footprints), &calc)))
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    let pipeline = Pipeline::new(IngestConfig::default(), AnalysisConfig::default()).unwrap();
    let records = make_log(1000);

    c.bench_function("full_pipeline_1000_cases", |b| {
        b.iter(|| black_box(pipeline.run(black_box(&records)).unwrap()))
    });
}

criterion_group!(benches, bench_extraction, bench_aggregation, bench_full_pipeline);
criterion_main!(benches);
