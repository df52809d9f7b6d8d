//! Locator compilation benchmarks.
//!
//! Locators are compiled on every element operation, so parsing and
//! expression building sit on the hot path of each command.
//!
//! Run with: cargo bench --bench locator
//! Results saved to: target/criterion/

use std::hint::black_box;

use cdp_driver::Locator;
use cdp_driver::locator::{DOCUMENT, js};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

// ============================================================================
// Inputs
// ============================================================================

const LOCATORS: &[(&str, &str)] = &[
    ("css", "form#login > input[name=\"user\"]"),
    ("xpath", "//table[@id='orders']//tr[3]/td[2]"),
    ("wildcard", "{button}Sign in"),
    ("wildcard_contains", "{^a:2}Read more"),
    ("any_tag", "{}Username"),
    ("script", "(document.body.lastElementChild)"),
];

// ============================================================================
// Benchmark: Parse
// ============================================================================

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for &(name, locator) in LOCATORS {
        group.bench_with_input(BenchmarkId::from_parameter(name), locator, |b, locator| {
            b.iter(|| Locator::parse(black_box(locator)));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Compile
// ============================================================================

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    for &(name, locator) in LOCATORS {
        let parsed = Locator::parse(locator).expect("valid locator");

        group.bench_with_input(BenchmarkId::new("selector", name), &parsed, |b, parsed| {
            b.iter(|| parsed.selector(black_box(DOCUMENT)));
        });
        group.bench_with_input(BenchmarkId::new("selector_all", name), &parsed, |b, parsed| {
            b.iter(|| parsed.selector_all(black_box(DOCUMENT)));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Action Scripts
// ============================================================================

fn bench_action_scripts(c: &mut Criterion) {
    let sel = Locator::parse("{button}Save")
        .expect("valid locator")
        .selector(DOCUMENT);

    c.bench_function("exists_probe", |b| b.iter(|| js::exists(black_box(&sel))));
    c.bench_function("script_on", |b| {
        b.iter(|| js::script_on(black_box(&sel), black_box("_.getAttribute('aria-label')")))
    });
}

criterion_group!(benches, bench_parse, bench_compile, bench_action_scripts);
criterion_main!(benches);
