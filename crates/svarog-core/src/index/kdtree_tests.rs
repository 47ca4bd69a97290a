//! Tests for the exact k-d tree index.

use super::kdtree::{KdTreeIndex, KdTreeParams};
use super::{Neighbor, VectorIndex};
use crate::dataset::Dataset;
use crate::distance::DistanceMetric;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn brute_force(vectors: &[Vec<f32>], query: &[f32], k: usize) -> Vec<u64> {
    let mut scored: Vec<(f32, u64)> = vectors
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let d: f32 = query
                .iter()
                .zip(v)
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            (d, i as u64)
        })
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    scored.truncate(k);
    scored.into_iter().map(|(_, id)| id).collect()
}

fn random_vectors(rng: &mut StdRng, n: usize, dim: usize) -> Vec<Vec<f32>> {
    (0..n)
        .map(|_| (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect()
}

fn build_index(dim: usize, vectors: Vec<Vec<f32>>, leaf_size: usize) -> KdTreeIndex {
    let mut index = KdTreeIndex::new(
        dim,
        DistanceMetric::SquaredEuclidean,
        KdTreeParams { leaf_size },
    )
    .unwrap();
    index
        .build(Dataset::from_vectors(dim, vectors).unwrap())
        .unwrap();
    index
}

fn ids(neighbors: &[Neighbor]) -> Vec<u64> {
    neighbors.iter().map(|n| n.id).collect()
}

#[test]
fn search_is_exact_against_brute_force() {
    let mut rng = StdRng::seed_from_u64(101);
    let vectors = random_vectors(&mut rng, 500, 6);
    let index = build_index(6, vectors.clone(), 8);

    for _ in 0..50 {
        let query: Vec<f32> = (0..6).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let hits = index.search(&query, 10).unwrap();
        assert_eq!(ids(&hits), brute_force(&vectors, &query, 10));
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }
}

#[test]
fn leaf_size_one_still_exact() {
    let mut rng = StdRng::seed_from_u64(5);
    let vectors = random_vectors(&mut rng, 64, 3);
    let index = build_index(3, vectors.clone(), 1);
    let query = [0.1f32, -0.2, 0.3];
    let hits = index.search(&query, 5).unwrap();
    assert_eq!(ids(&hits), brute_force(&vectors, &query, 5));
}

#[test]
fn k_larger_than_dataset_returns_everything() {
    let vectors = vec![vec![0.0f32, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]];
    let index = build_index(2, vectors, 16);
    let hits = index.search(&[0.0, 0.0], 10).unwrap();
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].id, 0);
}

#[test]
fn identical_vectors_terminate_and_tie_break_by_id() {
    let vectors = vec![vec![2.0f32, 2.0]; 40];
    let index = build_index(2, vectors, 4);
    let hits = index.search(&[2.0, 2.0], 3).unwrap();
    assert_eq!(ids(&hits), vec![0, 1, 2]);
    assert!(hits.iter().all(|n| n.distance == 0.0));
}

#[test]
fn empty_index_returns_empty() {
    let index = build_index(4, Vec::new(), 16);
    assert!(index.is_empty());
    assert!(index.search(&[0.0; 4], 5).unwrap().is_empty());
}

#[test]
fn euclidean_metric_reports_square_roots() {
    let vectors = vec![vec![0.0f32, 0.0], vec![3.0, 4.0]];
    let mut index =
        KdTreeIndex::new(2, DistanceMetric::Euclidean, KdTreeParams::default()).unwrap();
    index
        .build(Dataset::from_vectors(2, vectors).unwrap())
        .unwrap();
    let hits = index.search(&[0.0, 0.0], 2).unwrap();
    assert_eq!(hits[0].id, 0);
    assert!((hits[1].distance - 5.0).abs() < 1e-5);
}

#[test]
fn dimension_mismatch_is_rejected() {
    let index = build_index(3, vec![vec![0.0; 3]], 16);
    assert_eq!(index.search(&[0.0; 2], 1).unwrap_err().code(), "SVG-001");
}

#[test]
fn zero_k_is_rejected() {
    let index = build_index(2, vec![vec![0.0; 2]], 16);
    assert_eq!(index.search(&[0.0; 2], 0).unwrap_err().code(), "SVG-002");
}

#[test]
fn zero_leaf_size_is_rejected() {
    let err = KdTreeIndex::new(
        2,
        DistanceMetric::SquaredEuclidean,
        KdTreeParams { leaf_size: 0 },
    )
    .unwrap_err();
    assert_eq!(err.code(), "SVG-002");
}

#[test]
fn search_batch_matches_single_queries() {
    let mut rng = StdRng::seed_from_u64(77);
    let vectors = random_vectors(&mut rng, 200, 4);
    let index = build_index(4, vectors, 16);
    let queries = random_vectors(&mut rng, 8, 4);

    let batched = index.search_batch(&queries, 5).unwrap();
    for (query, row) in queries.iter().zip(&batched) {
        assert_eq!(ids(row), ids(&index.search(query, 5).unwrap()));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn exactness_holds_for_arbitrary_inputs(
        seed in any::<u64>(),
        n in 1usize..200,
        dim in 1usize..8,
        k in 1usize..12,
        leaf_size in 1usize..32,
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let vectors = random_vectors(&mut rng, n, dim);
        let index = build_index(dim, vectors.clone(), leaf_size);
        let query: Vec<f32> = (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let hits = index.search(&query, k).unwrap();
        prop_assert_eq!(ids(&hits), brute_force(&vectors, &query, k));
    }
}
