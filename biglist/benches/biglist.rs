use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use libbiglist::prelude::*;

pub fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("Append - 100k");
    group.sample_size(20);

    for block_size in [64, 512, 4096, 32768].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(block_size), block_size, |b, &block_size| {
            b.iter(|| {
                let mut list = BigList::with_config(BigListConfig::default().with_block_size(block_size)).unwrap();
                for i in 0..100_000_u64 {
                    list.add(i).unwrap();
                }
                list
            });
        });
    }
    group.finish();
}

pub fn bench_random_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("Random Insert - 20k");
    group.sample_size(20);

    for block_size in [64, 512, 4096].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(block_size), block_size, |b, &block_size| {
            b.iter(|| {
                let mut rng = StdRng::seed_from_u64(42);
                let mut list = BigList::with_config(BigListConfig::default().with_block_size(block_size)).unwrap();
                for i in 0..20_000_u64 {
                    let at = rng.gen_range(0..=list.len());
                    list.insert(at, i).unwrap();
                }
                list
            });
        });
    }
    group.finish();
}

pub fn bench_read(c: &mut Criterion) {
    let mut list = BigList::with_config(BigListConfig::default().with_block_size(1024)).unwrap();
    list.add_range(0..1_000_000_u64).unwrap();

    c.bench_function("sequential get - 1M", |b| {
        b.iter(|| {
            let mut sum = 0;
            for i in 0..list.len() {
                sum += list.get(black_box(i)).unwrap();
            }
            sum
        })
    });

    c.bench_function("iterate - 1M", |b| {
        b.iter(|| list.iter().map(|x| x.unwrap()).sum::<u64>())
    });

    let profile = Profile::default_profile().unwrap();
    let mut on_disk: BigList<u64, _> = BigList::on_disk(&profile).unwrap();
    on_disk.add_range(0..1_000_000_u64).unwrap();
    on_disk.commit().unwrap();

    c.bench_function("random get on disk - 1M", |b| {
        let mut rng = StdRng::seed_from_u64(7);
        b.iter(|| {
            let at = rng.gen_range(0..on_disk.len());
            on_disk.get(black_box(at)).unwrap()
        })
    });
}

criterion_group!(benches, bench_append, bench_random_insert, bench_read);
criterion_main!(benches);
