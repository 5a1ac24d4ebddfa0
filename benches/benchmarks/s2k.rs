use criterion::{black_box, criterion_group, BenchmarkId, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use pgp_engine::crypto::{HashAlgorithm, SymmetricKeyAlgorithm};
use pgp_engine::registry::AlgorithmRegistry;
use pgp_engine::types::StringToKey;

fn bench_s2k(c: &mut Criterion) {
    let registry = AlgorithmRegistry::with_defaults();
    let mut rng = ChaCha8Rng::seed_from_u64(0);

    let mut group = c.benchmark_group("s2k");
    let algs = [HashAlgorithm::Sha1, HashAlgorithm::Sha256, HashAlgorithm::Sha512];
    let counts = [
        1u8,
        96u8,    // default
        u8::MAX, // maximum possible
    ];
    let sym_alg = SymmetricKeyAlgorithm::AES256;

    for alg in algs {
        for count in counts {
            let s2k = StringToKey::new_iterated(&mut rng, alg, count);
            group.bench_with_input(
                BenchmarkId::new("derive_key", format!("{:?}/{}", alg, count)),
                &s2k,
                |b, s2k| {
                    b.iter(|| {
                        black_box(
                            s2k.derive_key(&registry, b"correct horse", sym_alg.key_size())
                                .unwrap(),
                        )
                    })
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_s2k);
