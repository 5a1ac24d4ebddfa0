use criterion::{black_box, criterion_group, Criterion, Throughput};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use pgp_engine::composed::{Deserializable, Message};
use pgp_engine::packet::parse_packets;
use pgp_engine::registry::AlgorithmRegistry;
use pgp_engine::ser::Serialize;
use pgp_engine::types::{CompressionAlgorithm, Mpi};

fn bench_packet(c: &mut Criterion) {
    let registry = AlgorithmRegistry::with_defaults();
    let mut g = c.benchmark_group("packet");

    {
        let mut bytes = vec![0x10, 0x00];
        bytes.extend(std::iter::repeat(0xFFu8).take(512));

        g.throughput(Throughput::Bytes(bytes.len() as u64));
        g.bench_function("mpi_parse_4096", |b| {
            b.iter(|| black_box(Mpi::from_buf(&bytes[..]).unwrap()))
        });
    }

    {
        let text = "lorem ipsum dolor sit amet ".repeat(4096);
        let msg = Message::new_literal("lorem.txt", &text).unwrap();
        let bytes = msg.to_bytes().unwrap();

        g.throughput(Throughput::Bytes(bytes.len() as u64));
        g.bench_function("parse_literal", |b| {
            b.iter(|| black_box(parse_packets(bytes.clone()).unwrap()))
        });

        let compressed = msg
            .compress(&registry, CompressionAlgorithm::ZLIB)
            .value()
            .unwrap();
        let compressed_bytes = compressed.to_bytes().unwrap();
        g.throughput(Throughput::Bytes(bytes.len() as u64));
        g.bench_function("parse_compressed_zlib", |b| {
            b.iter(|| {
                let msg = Message::from_bytes(compressed_bytes.clone()).unwrap();
                black_box(msg.literal_message(&registry).value().unwrap())
            })
        });

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let encrypted = msg
            .encrypt_with_password(&mut rng, &registry, &"bench".into(), &Default::default())
            .value()
            .unwrap();
        let encrypted_bytes = encrypted.to_bytes().unwrap();
        g.throughput(Throughput::Bytes(bytes.len() as u64));
        g.bench_function("decrypt_password_seipd", |b| {
            b.iter(|| {
                let msg = Message::from_bytes(encrypted_bytes.clone()).unwrap();
                black_box(
                    msg.decrypt_with_password(&registry, &"bench".into())
                        .value()
                        .unwrap(),
                )
            })
        });
    }

    g.finish();
}

criterion_group!(benches, bench_packet);
