//! Performance benchmarks for headless-settings.
//!
//! This module contains benchmarks for:
//! - Version comparison
//! - Snapshot aggregation with growing attribute filter lists
//! - HTML entity decoding of currency symbols
//!
//! Run with: `cargo bench`

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use headless_settings::core::{CommerceConfig, MemoryStore, SETTINGS_KEY};
use headless_settings::settings::{decode_html_entities, ConfigurationAggregator, RequestContext};
use headless_settings::update::is_update_available;
use headless_settings::ConfiguredCatalog;
use serde_json::json;

// ============================================================================
// Fixtures
// ============================================================================

mod fixtures {
    use super::*;

    /// Persisted settings with `num_filters` attribute filters.
    pub fn settings(num_filters: usize) -> serde_json::Value {
        let filters: Vec<_> = (0..num_filters)
            .map(|i| {
                json!({
                    "label": format!("Attribute {i}"),
                    "slug": format!("pa_attr_{i}"),
                    "showCount": i % 2 == 0,
                    "hideEmpty": "1",
                })
            })
            .collect();

        json!({
            "primary_color": "#112233",
            "logo": "https://cdn.example.com/logo.svg",
            "productsPerPage": "24",
            "frontEndUrl": "https://shop.example.com",
            "global_attributes": filters,
            "wooNuxtSEO": [
                {"provider": "instagram", "handle": "@shop", "url": "https://instagram.com/shop"}
            ],
        })
    }

    pub fn aggregator(num_filters: usize) -> ConfigurationAggregator {
        let store = Arc::new(MemoryStore::with_values([(SETTINGS_KEY, settings(num_filters))]));
        let catalog = Arc::new(ConfiguredCatalog::new(CommerceConfig {
            currency_symbol: "&euro;".to_string(),
            highest_price: Some(349.95),
            ..CommerceConfig::default()
        }));

        ConfigurationAggregator::new(store, catalog.clone(), catalog, "2.2.4")
    }
}

// ============================================================================
// Version Benchmarks
// ============================================================================

fn bench_version_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("version");

    group.bench_function("update_available", |b| {
        b.iter(|| is_update_available(black_box("2.2.4"), black_box("2.10.0")));
    });

    group.bench_function("sentinel", |b| {
        b.iter(|| is_update_available(black_box("2.2.4"), black_box("0.0.0")));
    });

    group.bench_function("malformed", |b| {
        b.iter(|| is_update_available(black_box("2.2.4"), black_box("v3-beta")));
    });

    group.finish();
}

// ============================================================================
// Snapshot Benchmarks
// ============================================================================

fn bench_build_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_snapshot");
    let request = RequestContext::with_host("shop.example.com");

    for num_filters in &[0usize, 10, 100] {
        let aggregator = fixtures::aggregator(*num_filters);

        group.throughput(Throughput::Elements(*num_filters as u64));
        group.bench_with_input(BenchmarkId::new("filters", num_filters), num_filters, |b, _| {
            b.iter(|| aggregator.build_snapshot(black_box(&request)));
        });
    }

    group.finish();
}

fn bench_entity_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_entities");

    for input in ["$", "&#36;", "&euro;", "&#x20B9;", "kr&nbsp;&amp;&nbsp;&#8364;"] {
        group.bench_with_input(BenchmarkId::from_parameter(input), input, |b, input| {
            b.iter(|| decode_html_entities(black_box(input)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_version_compare, bench_build_snapshot, bench_entity_decoding);
criterion_main!(benches);
