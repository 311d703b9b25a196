use criterion::{black_box, criterion_group, criterion_main, Criterion};
use weft_types::{ConsensusTime, EventHash, HashedEventData, NodeId};

fn sample_event() -> HashedEventData {
    HashedEventData {
        creator: NodeId(1),
        generation: 42,
        birth_round: 3,
        self_parent: Some(EventHash::new([1u8; 32])),
        other_parent: Some(EventHash::new([2u8; 32])),
        time_created: ConsensusTime::from_nanos(1_700_000_000_000_000_000),
        transactions: vec![vec![0xAB; 128]; 4],
    }
}

fn hash_event_bench(c: &mut Criterion) {
    let data = sample_event();

    c.bench_function("hash_event_4tx", |b| {
        b.iter(|| weft_crypto::hash_event(black_box(&data)))
    });
}

fn sign_event_bench(c: &mut Criterion) {
    let kp = weft_crypto::keypair_from_seed(&[7u8; 32]);
    let hash = weft_crypto::hash_event(&sample_event());

    c.bench_function("sign_event", |b| {
        b.iter(|| weft_crypto::sign_event(black_box(&hash), &kp.private))
    });
}

fn blake2b_256_bench(c: &mut Criterion) {
    let data = [0xABu8; 256];

    c.bench_function("blake2b_256_256B", |b| {
        b.iter(|| weft_crypto::blake2b_256(black_box(&data)))
    });
}

criterion_group!(benches, hash_event_bench, sign_event_bench, blake2b_256_bench);
criterion_main!(benches);
