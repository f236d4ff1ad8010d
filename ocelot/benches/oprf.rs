//! Oblivious pseudorandom function benchmarks using `criterion`.

use criterion::{criterion_group, criterion_main, Criterion};
use ocelot::oprf::{EcdhReceiver, EcdhSender, OprfKey};
use rand::{rngs::StdRng, SeedableRng};
use std::time::Duration;

const NBITS: u32 = 40;

fn rand_vec_vec(size: usize) -> Vec<Vec<u8>> {
    (0..size)
        .map(|_| rand::random::<[u8; 8]>().to_vec())
        .collect()
}

fn bench_oprf(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let sender = EcdhSender::new(OprfKey::random(&mut rng), NBITS);
    let receiver = EcdhReceiver::new(OprfKey::random(&mut rng), NBITS);

    c.bench_function("oprf::ECDH offline (n = 2^12)", |bench| {
        let inputs = rand_vec_vec(1 << 12);
        bench.iter(|| criterion::black_box(sender.offline_evaluate(&inputs)))
    });
    c.bench_function("oprf::ECDH blind (n = 2^12)", |bench| {
        let inputs = rand_vec_vec(1 << 12);
        bench.iter(|| criterion::black_box(receiver.blind(&inputs)))
    });
    c.bench_function("oprf::ECDH evaluate + unblind (n = 2^12)", |bench| {
        let blinded = receiver.blind(&rand_vec_vec(1 << 12));
        bench.iter(|| {
            let evaluated = sender.online_blind_evaluate(&blinded).unwrap();
            criterion::black_box(receiver.unblind(&evaluated).unwrap())
        })
    });
}

criterion_group! {
    name = oprf;
    config = Criterion::default().warm_up_time(Duration::from_millis(100)).sample_size(10);
    targets = bench_oprf
}
criterion_main!(oprf);
