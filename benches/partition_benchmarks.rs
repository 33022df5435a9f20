use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::Rng;

use rusty_partition::{
    distribute::{box_weights, partition_boxes},
    partition::{oct_tree_partition, PartitionConfig},
    types::{domain::Domain, Bounds, WeightType},
};

fn boxes(nboxes: usize) -> Vec<(Bounds, WeightType)> {
    let mut rng = rand::thread_rng();
    (0..nboxes)
        .map(|_| {
            let extent = rng.gen_range(0.0..0.01);
            let mut b = [0.0; 6];
            for axis in 0..3 {
                b[axis] = rng.gen::<f64>();
                b[axis + 3] = b[axis] + extent;
            }
            (b, 1.0)
        })
        .collect()
}

fn benchmark_box_weights(c: &mut Criterion) {
    let boxes = boxes(1000000);
    let domain = Domain::new([0.0, 0.0, 0.0, 1.01, 1.01, 1.01]);

    c.bench_function("box weights", |b| {
        b.iter(|| {
            box_weights(&domain, &boxes, black_box(5)).unwrap();
        })
    });
}

fn benchmark_partition(c: &mut Criterion) {
    let boxes = boxes(100000);
    let domain = Domain::new([0.0, 0.0, 0.0, 1.01, 1.01, 1.01]);
    let nprocs = 1024;
    let config = PartitionConfig::for_processes(nprocs);
    let weights = box_weights(&domain, &boxes, config.depth).unwrap();

    c.bench_function("partition serial", |b| {
        b.iter(|| {
            let mut weights = weights.clone();
            oct_tree_partition(black_box(nprocs), &config, weights.as_mut_slice()).unwrap();
        })
    });

    let parallel = PartitionConfig {
        parallel: true,
        ..config
    };
    c.bench_function("partition parallel", |b| {
        b.iter(|| {
            let mut weights = weights.clone();
            oct_tree_partition(black_box(nprocs), &parallel, weights.as_mut_slice()).unwrap();
        })
    });
}

fn benchmark_partition_boxes(c: &mut Criterion) {
    let boxes = boxes(100000);
    let domain = Domain::new([0.0, 0.0, 0.0, 1.01, 1.01, 1.01]);

    c.bench_function("partition boxes", |b| {
        b.iter(|| {
            partition_boxes(&domain, &boxes, black_box(64), &PartitionConfig::default()).unwrap();
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(30).measurement_time(std::time::Duration::from_secs(10));
    targets = benchmark_box_weights,
              benchmark_partition,
              benchmark_partition_boxes,
            }
criterion_main!(benches);
