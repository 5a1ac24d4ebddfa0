use criterion::criterion_main;

mod benchmarks;

criterion_main!(
    benchmarks::packet::benches,
    benchmarks::mode::benches,
    benchmarks::s2k::benches,
);
