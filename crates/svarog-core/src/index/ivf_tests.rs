//! Tests for the IVFFlat index.

use super::ivf::{IvfFlatIndex, IvfParams};
use super::{Neighbor, VectorIndex};
use crate::dataset::Dataset;
use crate::distance::DistanceMetric;
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

fn build_index(dim: usize, vectors: Vec<Vec<f32>>, params: IvfParams) -> IvfFlatIndex {
    let mut index = IvfFlatIndex::new(dim, DistanceMetric::SquaredEuclidean, params).unwrap();
    index
        .build(Dataset::from_vectors(dim, vectors).unwrap())
        .unwrap();
    index
}

fn ids(neighbors: &[Neighbor]) -> Vec<u64> {
    neighbors.iter().map(|n| n.id).collect()
}

fn set_overlap(a: &[u64], b: &[u64]) -> usize {
    a.iter().filter(|id| b.contains(id)).count()
}

#[test]
fn probing_all_clusters_is_exact() {
    let mut rng = StdRng::seed_from_u64(21);
    let vectors = random_vectors(&mut rng, 1000, 8);
    let params = IvfParams {
        nlist: 16,
        nprobe: 16,
        ..IvfParams::default()
    };
    let index = build_index(8, vectors.clone(), params);

    for _ in 0..25 {
        let query: Vec<f32> = (0..8).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let hits = index.search_with_nprobe(&query, 5, 16).unwrap();
        assert_eq!(ids(&hits), brute_force(&vectors, &query, 5));
    }
}

#[test]
fn recall_is_monotone_in_nprobe() {
    let mut rng = StdRng::seed_from_u64(33);
    let vectors = random_vectors(&mut rng, 800, 8);
    let params = IvfParams {
        nlist: 32,
        nprobe: 1,
        ..IvfParams::default()
    };
    let index = build_index(8, vectors.clone(), params);

    let query: Vec<f32> = (0..8).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let exact = brute_force(&vectors, &query, 10);
    let mut prev_hits = 0usize;
    for nprobe in [1usize, 2, 4, 8, 16, 32] {
        let hits = index.search_with_nprobe(&query, 10, nprobe).unwrap();
        let overlap = set_overlap(&ids(&hits), &exact);
        assert!(
            overlap >= prev_hits,
            "recall dropped at nprobe={nprobe}: {overlap} < {prev_hits}"
        );
        prev_hits = overlap;
    }
    assert_eq!(prev_hits, 10);
}

#[test]
fn builds_are_deterministic_for_a_fixed_seed() {
    let mut rng = StdRng::seed_from_u64(9);
    let vectors = random_vectors(&mut rng, 300, 4);
    let params = IvfParams {
        nlist: 10,
        nprobe: 3,
        ..IvfParams::default()
    };
    let a = build_index(4, vectors.clone(), params);
    let b = build_index(4, vectors, params);

    let query = [0.2f32, -0.1, 0.4, 0.0];
    assert_eq!(
        ids(&a.search(&query, 5).unwrap()),
        ids(&b.search(&query, 5).unwrap())
    );
    assert_eq!(a.centroids, b.centroids);
}

#[test]
fn every_vector_lands_in_exactly_one_list() {
    let mut rng = StdRng::seed_from_u64(44);
    let vectors = random_vectors(&mut rng, 256, 4);
    let params = IvfParams {
        nlist: 8,
        nprobe: 2,
        ..IvfParams::default()
    };
    let index = build_index(4, vectors, params);

    let mut seen = vec![false; 256];
    for list in &index.lists {
        for &id in list {
            assert!(!seen[id as usize], "id {id} assigned twice");
            seen[id as usize] = true;
        }
    }
    assert!(seen.iter().all(|&s| s));
}

#[test]
fn set_nprobe_changes_the_default() {
    let mut rng = StdRng::seed_from_u64(2);
    let vectors = random_vectors(&mut rng, 100, 4);
    let params = IvfParams {
        nlist: 10,
        nprobe: 1,
        ..IvfParams::default()
    };
    let index = build_index(4, vectors, params);

    assert_eq!(index.nprobe(), 1);
    index.set_nprobe(10).unwrap();
    assert_eq!(index.nprobe(), 10);
    assert_eq!(index.set_nprobe(0).unwrap_err().code(), "SVG-002");
    assert_eq!(index.set_nprobe(11).unwrap_err().code(), "SVG-002");
}

#[test]
fn nlist_exceeding_dataset_size_is_rejected() {
    let mut index = IvfFlatIndex::new(
        2,
        DistanceMetric::SquaredEuclidean,
        IvfParams {
            nlist: 8,
            nprobe: 1,
            ..IvfParams::default()
        },
    )
    .unwrap();
    let dataset = Dataset::from_vectors(2, vec![vec![0.0, 0.0]; 4]).unwrap();
    assert_eq!(index.build(dataset).unwrap_err().code(), "SVG-002");
}

#[test]
fn nprobe_above_nlist_is_rejected_at_search() {
    let mut rng = StdRng::seed_from_u64(3);
    let vectors = random_vectors(&mut rng, 50, 2);
    let params = IvfParams {
        nlist: 5,
        nprobe: 1,
        ..IvfParams::default()
    };
    let index = build_index(2, vectors, params);
    let err = index.search_with_nprobe(&[0.0, 0.0], 1, 6).unwrap_err();
    assert_eq!(err.code(), "SVG-002");
}

#[test]
fn invalid_params_are_rejected_up_front() {
    let bad = IvfParams {
        nlist: 4,
        nprobe: 8,
        ..IvfParams::default()
    };
    assert!(IvfFlatIndex::new(2, DistanceMetric::SquaredEuclidean, bad).is_err());
}

#[test]
fn empty_build_searches_empty() {
    let mut index =
        IvfFlatIndex::new(4, DistanceMetric::SquaredEuclidean, IvfParams::default()).unwrap();
    index
        .build(Dataset::from_vectors(4, Vec::new()).unwrap())
        .unwrap();
    assert!(index.search(&[0.0; 4], 3).unwrap().is_empty());
}

#[test]
fn duplicate_points_survive_kmeans() {
    // Fewer distinct points than clusters exercises empty-cluster reseeding.
    let mut vectors = vec![vec![0.0f32, 0.0]; 20];
    vectors.extend(vec![vec![5.0f32, 5.0]; 20]);
    let params = IvfParams {
        nlist: 8,
        nprobe: 8,
        ..IvfParams::default()
    };
    let index = build_index(2, vectors, params);
    let hits = index.search(&[5.0, 5.0], 3).unwrap();
    assert!(hits.iter().all(|n| n.id >= 20));
    assert!(hits.iter().all(|n| n.distance == 0.0));
}

#[test]
fn search_batch_matches_single_queries() {
    let mut rng = StdRng::seed_from_u64(55);
    let vectors = random_vectors(&mut rng, 200, 4);
    let params = IvfParams {
        nlist: 8,
        nprobe: 4,
        ..IvfParams::default()
    };
    let index = build_index(4, vectors, params);
    let queries = random_vectors(&mut rng, 6, 4);

    let batched = index.search_batch_with_nprobe(&queries, 5, 4).unwrap();
    for (query, row) in queries.iter().zip(&batched) {
        assert_eq!(ids(row), ids(&index.search_with_nprobe(query, 5, 4).unwrap()));
    }
}
