//! Cross-module layout properties: touches algebra over every partition
//! policy, schedule coverage, and patch-list serialization.

use std::sync::Arc;
use tessera_domain::Domain;
use tessera_layout::{
    partition, ContextPolicy, GuardLayers, Layout, LayoutView, PartitionPolicy, PatchRecord,
};

fn policies() -> Vec<(&'static str, PartitionPolicy)> {
    vec![
        (
            "uniform",
            PartitionPolicy::UniformBlocks { blocks: vec![3, 4] },
        ),
        (
            "grid",
            PartitionPolicy::ExplicitGrid {
                breakpoints: vec![vec![3, 9], vec![2, 5, 8]],
            },
        ),
        (
            "tiles",
            PartitionPolicy::TileList {
                tiles: vec![
                    Domain::rect(&[(0, 5), (0, 10)]),
                    Domain::rect(&[(6, 11), (0, 4)]),
                    Domain::rect(&[(6, 11), (5, 10)]),
                ],
            },
        ),
    ]
}

/// `union(touches(D)) == intersect(D, G)` with pairwise disjoint results,
/// for queries inside, straddling, and outside the global domain.
#[test]
fn touches_union_and_disjointness_all_policies() {
    let global = Domain::rect(&[(0, 11), (0, 10)]);
    let queries = [
        Domain::rect(&[(0, 11), (0, 10)]),
        Domain::rect(&[(2, 7), (3, 9)]),
        Domain::rect(&[(-4, 3), (8, 15)]),
        Domain::rect(&[(20, 25), (0, 3)]),
        Domain::rect(&[(5, 5), (5, 5)]),
    ];

    for (name, policy) in policies() {
        let layout = Layout::new(
            global.clone(),
            policy,
            GuardLayers::uniform(2, 1, 0),
            &ContextPolicy::Replicated,
            1,
        )
        .unwrap();

        for query in &queries {
            let hits = layout.touches(query);
            let covered: usize = hits.iter().map(|(_, d)| d.size()).sum();
            assert_eq!(
                covered,
                query.intersect(&global).size(),
                "{name}: union(touches) must equal query ∩ global for {query}"
            );
            for (i, (_, a)) in hits.iter().enumerate() {
                for (_, b) in hits.iter().skip(i + 1) {
                    assert!(!a.touches(b), "{name}: touches results must be disjoint");
                }
            }
        }
    }
}

/// Every touches intersection lies inside the reported patch's owned domain,
/// and global_id agrees with the reporting patch.
#[test]
fn touches_results_match_ownership() {
    let global = Domain::rect(&[(0, 11), (0, 10)]);
    for (name, policy) in policies() {
        let layout = Layout::new(
            global.clone(),
            policy,
            GuardLayers::none(2),
            &ContextPolicy::Replicated,
            1,
        )
        .unwrap();
        for (id, overlap) in layout.touches(&Domain::rect(&[(1, 10), (2, 9)])) {
            assert!(layout.node(id).owned().contains(&overlap), "{name}");
            overlap.for_each_point(|p| assert_eq!(layout.global_id(p), id, "{name}"));
        }
    }
}

/// Reference decomposition: 9x9 domain, 3x3 equal blocks, internal
/// guards 2, external guards 1.
#[test]
fn nine_by_nine_reference_layout() {
    let layout = Layout::new(
        Domain::rect(&[(0, 8), (0, 8)]),
        PartitionPolicy::UniformBlocks { blocks: vec![3, 3] },
        GuardLayers::uniform(2, 2, 1),
        &ContextPolicy::Replicated,
        1,
    )
    .unwrap();

    assert_eq!(layout.patches(), 9);
    for node in layout.nodes() {
        assert_eq!(node.owned().size(), 9);
    }

    // Owner lookup matches per-axis block arithmetic everywhere.
    layout.global_domain().clone().for_each_point(|p| {
        let expected = (p[0] / 3) * 3 + p[1] / 3;
        assert_eq!(layout.global_id(p).id(), expected as u32);
    });
}

/// Guard schedule entries only name guard cells of their destination and
/// owned cells of their source, and together cover every internal guard
/// cell exactly once.
#[test]
fn schedule_covers_guard_cells_once() {
    let layout = Layout::new(
        Domain::rect(&[(0, 8), (0, 8)]),
        PartitionPolicy::UniformBlocks { blocks: vec![3, 3] },
        GuardLayers::uniform(2, 2, 0),
        &ContextPolicy::Replicated,
        1,
    )
    .unwrap();
    let schedule = layout.fill_schedule();

    let mut filled_per_patch = vec![0usize; layout.patches()];
    for request in schedule.iter() {
        let source = layout.node(request.source);
        let destination = layout.node(request.destination);
        assert!(source.owned().contains(&request.region));
        let dest_region = request.destination_region();
        assert!(destination.allocated().contains(&dest_region));
        assert!(!destination.owned().touches(&dest_region));
        filled_per_patch[request.destination.index()] += dest_region.size();
    }

    // Each patch's fillable guard cells are exactly the allocated cells
    // inside the global domain but outside the owned region.
    for node in layout.nodes() {
        let fillable = node.allocated().intersect(layout.global_domain()).size() - node.owned().size();
        assert_eq!(filled_per_patch[node.id().index()], fillable);
    }
}

#[test]
fn patch_records_survive_json() {
    let layout = Layout::new(
        Domain::rect(&[(0, 11), (0, 10)]),
        PartitionPolicy::UniformBlocks { blocks: vec![3, 2] },
        GuardLayers::uniform(2, 1, 0),
        &ContextPolicy::DistributedUniform,
        4,
    )
    .unwrap();

    let records = layout.patch_records();
    let json = serde_json::to_string(&records).unwrap();
    let decoded: Vec<PatchRecord> = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, records);

    let rebuilt = Layout::from_explicit_patch_list(
        layout.global_domain().clone(),
        layout.guards().clone(),
        layout.periodic().to_vec(),
        decoded,
    )
    .unwrap();
    assert_eq!(rebuilt.nodes(), layout.nodes());
    assert_eq!(rebuilt.context_count(), layout.context_count());
}

/// Tile partitions leave seams unowned; border_regions exposes them and a
/// layout rebuilt with seams assigned covers the whole domain.
#[test]
fn tile_seams_can_be_claimed() {
    let global = Domain::rect(&[(0, 9), (0, 9)]);
    let tiles = vec![
        Domain::rect(&[(0, 4), (0, 4)]),
        Domain::rect(&[(5, 9), (5, 9)]),
    ];
    let seams = partition::border_regions(&global, &tiles);
    assert!(!seams.is_empty());

    let mut records: Vec<PatchRecord> = tiles
        .iter()
        .map(|t| PatchRecord {
            context: tessera_layout::ContextId::new(0),
            owned: t.clone(),
        })
        .collect();
    records.extend(seams.iter().map(|s| PatchRecord {
        context: tessera_layout::ContextId::new(1),
        owned: s.clone(),
    }));

    let layout = Layout::from_explicit_patch_list(
        global.clone(),
        GuardLayers::none(2),
        vec![false, false],
        records,
    )
    .unwrap();
    let covered: usize = layout.nodes().iter().map(|n| n.owned().size()).sum();
    assert_eq!(covered, global.size());
}

#[test]
fn views_and_slices_share_one_layout() {
    let layout = Arc::new(
        Layout::new(
            Domain::rect(&[(0, 11), (0, 10)]),
            PartitionPolicy::UniformBlocks { blocks: vec![3, 2] },
            GuardLayers::none(2),
            &ContextPolicy::Replicated,
            1,
        )
        .unwrap(),
    );

    let window = LayoutView::new(Arc::clone(&layout), &Domain::rect(&[(2, 9), (1, 8)])).unwrap();
    let column = window.slice(1, 3).unwrap();

    assert!(Arc::ptr_eq(window.base(), &layout));
    assert!(Arc::ptr_eq(column.base(), &layout));
    assert_eq!(column.dim(), 1);

    // The column walks base column 4 across both patch rows.
    let hits = column.touches(&Domain::line(0, 7));
    let covered: usize = hits.iter().map(|(_, d)| d.size()).sum();
    assert_eq!(covered, 8);
    for (id, overlap) in hits {
        overlap.for_each_point(|p| {
            assert_eq!(column.global_id(p), id);
        });
    }

    let _ = LayoutView::new(Arc::clone(&layout), &Domain::rect(&[(0, 11), (0, 10)])).unwrap();
}
