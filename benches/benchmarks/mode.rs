use criterion::{black_box, criterion_group, BenchmarkId, Criterion, Throughput};

use pgp_engine::crypto::mode::{Cbc, Cfb, CipherMode, Ctr, Ocfb};
use pgp_engine::crypto::SymmetricKeyAlgorithm;
use pgp_engine::registry::AlgorithmRegistry;

const KEY: [u8; 32] = [0x42; 32];

fn modes(alg: SymmetricKeyAlgorithm) -> Vec<(&'static str, Box<dyn CipherMode>)> {
    let registry = AlgorithmRegistry::with_defaults();
    let cipher = || {
        registry
            .symmetric_cipher(alg, &KEY[..alg.key_size()])
            .unwrap()
    };
    let modes: [(&'static str, Box<dyn CipherMode>); 4] = [
        ("cbc", Box::new(Cbc::new(cipher()).unwrap())),
        ("cfb", Box::new(Cfb::new(cipher()))),
        ("ctr", Box::new(Ctr::new(cipher()))),
        ("ocfb", Box::new(Ocfb::new(cipher(), false))),
    ];
    modes.into()
}

fn bench_modes(c: &mut Criterion) {
    let sizes = [64usize, 1024, 16 * 1024];

    for alg in [SymmetricKeyAlgorithm::AES128, SymmetricKeyAlgorithm::CAST5] {
        let mut group = c.benchmark_group(format!("mode/{:?}", alg));
        let iv = vec![0u8; alg.block_size()];

        for (name, mode) in modes(alg) {
            for size in sizes {
                let data = vec![0xA5u8; size];
                let encrypted = mode.encrypt(&data, &iv).value().unwrap();

                group.throughput(Throughput::Bytes(size as u64));
                group.bench_with_input(
                    BenchmarkId::new(format!("{name}_encrypt"), size),
                    &data,
                    |b, data| b.iter(|| black_box(mode.encrypt(data, &iv).value().unwrap())),
                );
                group.bench_with_input(
                    BenchmarkId::new(format!("{name}_decrypt"), size),
                    &encrypted,
                    |b, encrypted| {
                        b.iter(|| black_box(mode.decrypt(encrypted, &iv).value().unwrap()))
                    },
                );
            }
        }
        group.finish();
    }
}

criterion_group!(benches, bench_modes);
