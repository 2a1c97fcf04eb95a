use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use dev_utils::{batch_query, example_request, get_example_scenario, random_requests};
use raptor::{raptor_query, RaptorProfile, RaptorService};

fn raptor_benchmark(c: &mut Criterion) {
    let (network, start, start_time, end) = get_example_scenario();
    let request = example_request(RaptorProfile::Standard, start, start_time, end);
    c.bench_function("Raptor", |b| b.iter(|| raptor_query(black_box(&request), &network)));
}

fn best_time_benchmark(c: &mut Criterion) {
    let (network, start, start_time, end) = get_example_scenario();
    let request = example_request(RaptorProfile::BestTime, start, start_time, end);
    c.bench_function("Raptor best time", |b| b.iter(|| raptor_query(black_box(&request), &network)));
}

fn batch_benchmark(c: &mut Criterion) {
    let (network, ..) = get_example_scenario();
    let service = RaptorService::default();
    let requests = random_requests(RaptorProfile::Standard, 64, 3);
    c.bench_function("Raptor batch", |b| b.iter(|| batch_query(&service, &network, black_box(&requests))));
}

criterion_group!(benches, raptor_benchmark, best_time_benchmark, batch_benchmark);
criterion_main!(benches);
