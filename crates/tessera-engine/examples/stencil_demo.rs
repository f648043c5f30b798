//! Example demonstrating a guard-synchronized stencil sweep
//!
//! This example shows how to:
//! 1. Partition a 1-D domain into patches with one guard cell per side
//! 2. Fill guards so each patch can read its neighbors' edge values
//! 3. Run a 3-point average stencil patch by patch, touching only local data
//! 4. Watch the compressible representation collapse and expand
//!
//! Run with: cargo run --example stencil_demo

use std::sync::Arc;
use tessera_domain::Domain;
use tessera_engine::{PatchArray, Storage};
use tessera_layout::{ContextPolicy, GuardLayers, Layout, PartitionPolicy};

fn main() {
    println!("=== Tessera Guard-Synchronized Stencil Demo ===\n");

    // 1. A 24-cell line in 4 patches, one guard cell on each internal face.
    println!("1. Building the layout...");
    let layout = Arc::new(
        Layout::new(
            Domain::line(0, 23),
            PartitionPolicy::UniformBlocks { blocks: vec![4] },
            GuardLayers::uniform(1, 1, 0),
            &ContextPolicy::Replicated,
            1,
        )
        .expect("layout configuration is valid"),
    );
    for node in layout.nodes() {
        println!("   - {node}");
    }
    println!(
        "   - fill schedule: {} requests\n",
        layout.fill_schedule().len()
    );

    // 2. Seed a sawtooth and synchronize the guards.
    println!("2. Seeding data and filling guards...");
    let mut array = PatchArray::<f64>::new_dense(Arc::clone(&layout));
    array.assign(|p| (p[0] % 6) as f64).expect("seed");
    array.fill_guards().expect("fill guards");
    println!("   - data: {:?}\n", array.to_vec().expect("snapshot"));

    // 3. One Jacobi-style sweep: every interior cell becomes the average of
    //    its neighborhood. Guard cells supply the cross-patch neighbors.
    println!("3. Running one 3-point average sweep...");
    let mut next = PatchArray::<f64>::new_dense(Arc::clone(&layout));
    for node in layout.nodes() {
        let source = array.block(node.id()).expect("source block");
        for point in node.owned().iter_points() {
            let x = point[0];
            let left = if x == 0 { x } else { x - 1 };
            let right = if x == 23 { x } else { x + 1 };
            let average = (source.read(array.arena(), &[left]).expect("left")
                + source.read(array.arena(), &[x]).expect("center")
                + source.read(array.arena(), &[right]).expect("right"))
                / 3.0;
            next.set(&point, average).expect("write");
        }
    }
    println!("   - smoothed: {:?}\n", next.to_vec().expect("snapshot"));

    // 4. Compressible storage collapses uniform patches to one scalar.
    println!("4. Compressible representation:");
    let mut uniform = PatchArray::<f64>::new_compressible(Arc::clone(&layout), 0.0);
    uniform.fill(1.5).expect("fill");
    let patch = layout.nodes()[0].id();
    println!(
        "   - after fill(1.5): patch 0 compressed = {}",
        uniform
            .block(patch)
            .expect("block")
            .is_compressed(uniform.arena())
            .expect("state")
    );
    uniform.set(&[3], 2.0).expect("write");
    println!(
        "   - after one differing write: patch 0 compressed = {}",
        uniform
            .block(patch)
            .expect("block")
            .is_compressed(uniform.arena())
            .expect("state")
    );
    println!("\nDone.");
}
