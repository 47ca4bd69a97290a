//! Save/load round-trips for every index variant.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use svarog_core::{
    read_index, Dataset, DistanceMetric, HnswParams, Index, IndexKind, IndexParams, IvfParams,
    KdTreeParams, Neighbor, VectorIndex,
};

fn random_vectors(rng: &mut StdRng, n: usize, dim: usize) -> Vec<Vec<f32>> {
    (0..n)
        .map(|_| (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect()
}

fn ids(neighbors: &[Neighbor]) -> Vec<u64> {
    neighbors.iter().map(|n| n.id).collect()
}

fn build(dim: usize, vectors: Vec<Vec<f32>>, params: IndexParams) -> Index {
    let mut index = Index::new(dim, DistanceMetric::SquaredEuclidean, params).unwrap();
    index
        .build(Dataset::from_vectors(dim, vectors).unwrap())
        .unwrap();
    index
}

fn assert_roundtrip(params: IndexParams, kind: IndexKind) {
    let mut rng = StdRng::seed_from_u64(kind.tag() as u64);
    let dim = 6;
    let vectors = random_vectors(&mut rng, 400, dim);
    let queries = random_vectors(&mut rng, 10, dim);

    let index = build(dim, vectors, params);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.svix");
    index.save(&path).unwrap();

    let reloaded = read_index(&path).unwrap();
    assert_eq!(reloaded.kind(), kind);
    assert_eq!(reloaded.dimension(), dim);
    assert_eq!(reloaded.len(), index.len());

    for query in &queries {
        let before = index.search(query, 10).unwrap();
        let after = reloaded.search(query, 10).unwrap();
        assert_eq!(ids(&before), ids(&after));
        for (a, b) in before.iter().zip(&after) {
            assert_eq!(a.distance.to_bits(), b.distance.to_bits());
        }
    }
}

#[test]
fn hnsw_roundtrip_is_bit_identical() {
    assert_roundtrip(IndexParams::Hnsw(HnswParams::default()), IndexKind::Hnsw);
}

#[test]
fn ivf_roundtrip_is_bit_identical() {
    assert_roundtrip(
        IndexParams::IvfFlat(IvfParams {
            nlist: 16,
            nprobe: 4,
            ..IvfParams::default()
        }),
        IndexKind::IvfFlat,
    );
}

#[test]
fn kdtree_roundtrip_is_bit_identical() {
    assert_roundtrip(
        IndexParams::KdTree(KdTreeParams::default()),
        IndexKind::KdTree,
    );
}

#[test]
fn empty_indexes_roundtrip() {
    for params in [
        IndexParams::Hnsw(HnswParams::default()),
        IndexParams::IvfFlat(IvfParams::default()),
        IndexParams::KdTree(KdTreeParams::default()),
    ] {
        let index = build(4, Vec::new(), params);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.svix");
        index.save(&path).unwrap();

        let reloaded = read_index(&path).unwrap();
        assert!(reloaded.is_empty());
        assert!(reloaded.search(&[0.0; 4], 3).unwrap().is_empty());
    }
}

#[test]
fn hnsw_ef_default_survives_reload() {
    let mut rng = StdRng::seed_from_u64(5);
    let index = build(
        4,
        random_vectors(&mut rng, 50, 4),
        IndexParams::Hnsw(HnswParams::default()),
    );
    index.as_hnsw().unwrap().set_ef_search(192).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.svix");
    index.save(&path).unwrap();

    let reloaded = read_index(&path).unwrap();
    assert_eq!(reloaded.as_hnsw().unwrap().ef_search(), 192);
}

#[test]
fn ivf_nprobe_default_survives_reload() {
    let mut rng = StdRng::seed_from_u64(6);
    let index = build(
        4,
        random_vectors(&mut rng, 100, 4),
        IndexParams::IvfFlat(IvfParams {
            nlist: 10,
            nprobe: 2,
            ..IvfParams::default()
        }),
    );
    index.as_ivf().unwrap().set_nprobe(7).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.svix");
    index.save(&path).unwrap();

    let reloaded = read_index(&path).unwrap();
    assert_eq!(reloaded.as_ivf().unwrap().nprobe(), 7);
}

#[test]
fn garbage_files_are_rejected_with_a_clear_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.svix");
    std::fs::write(&path, b"this is not an index").unwrap();
    let err = read_index(&path).unwrap_err();
    assert_eq!(err.code(), "SVG-004");
    assert!(err.to_string().contains("magic"));
}

#[test]
fn truncated_payloads_are_rejected() {
    let mut rng = StdRng::seed_from_u64(9);
    let index = build(
        4,
        random_vectors(&mut rng, 60, 4),
        IndexParams::KdTree(KdTreeParams::default()),
    );
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.svix");
    index.save(&path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
    let err = read_index(&path).unwrap_err();
    assert_eq!(err.code(), "SVG-004");
}

#[test]
fn save_does_not_clobber_on_failure() {
    // Saving to a path whose parent is missing fails and leaves nothing behind.
    let mut rng = StdRng::seed_from_u64(10);
    let index = build(
        4,
        random_vectors(&mut rng, 20, 4),
        IndexParams::KdTree(KdTreeParams::default()),
    );
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent-subdir").join("index.svix");
    assert!(index.save(&path).is_err());
    assert!(!path.exists());
}
