use rand::prelude::*;
use rand::SeedableRng;

use rusty_partition::{
    distribute::{box_weights, partition_boxes},
    error::Result,
    partition::PartitionConfig,
    types::{domain::Domain, Bounds, WeightType},
};

fn main() -> Result<()> {
    env_logger::init();

    // Experimental Parameters
    let nboxes = 100000;
    let nprocs = 16;

    let mut range = StdRng::seed_from_u64(0);
    let between = rand::distributions::Uniform::from(0.0..1.0);

    // Boxes clustered towards the origin, so the balanced partition is far from uniform.
    let boxes: Vec<(Bounds, WeightType)> = (0..nboxes)
        .map(|_| {
            let extent = 0.01 * between.sample(&mut range);
            let mut b = [0.0; 6];
            for axis in 0..3 {
                let low: f64 = between.sample(&mut range);
                b[axis] = low * low;
                b[axis + 3] = b[axis] + extent;
            }
            (b, 1.0)
        })
        .collect();

    let domain = match Domain::from_boxes(boxes.iter().map(|(b, _)| b)) {
        Some(domain) => domain,
        None => return Ok(()),
    };

    let config = PartitionConfig::for_processes(nprocs);
    let partition = partition_boxes(&domain, &boxes, nprocs, &config)?;

    let weights = box_weights(&domain, &boxes, config.depth)?;
    let loads = partition.process_loads(&weights)?;
    let ideal = weights.total() / nprocs as f64;

    println!("process  first key                load    imbalance");
    for (process, (cut, load)) in partition.cuts().iter().zip(loads.iter()).enumerate() {
        println!(
            "{:>7}  {:<24} {:>7.0} {:>+11.3}",
            process,
            cut.to_string(),
            load,
            load / ideal - 1.0
        );
    }

    Ok(())
}
