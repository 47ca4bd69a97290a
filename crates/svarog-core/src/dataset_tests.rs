//! Tests for the dimension-checked dataset.

use crate::dataset::Dataset;
use crate::error::Error;

#[test]
fn zero_dimension_is_rejected() {
    let err = Dataset::new(0).unwrap_err();
    assert_eq!(err.code(), "SVG-002");
}

#[test]
fn push_assigns_sequential_original_ids() {
    let mut dataset = Dataset::new(2).unwrap();
    assert_eq!(dataset.push(vec![0.0, 1.0]).unwrap(), 0);
    assert_eq!(dataset.push(vec![1.0, 0.0]).unwrap(), 1);
    assert_eq!(dataset.push(vec![1.0, 1.0]).unwrap(), 2);
    assert_eq!(dataset.len(), 3);
    assert_eq!(dataset.get(1), Some(&[1.0f32, 0.0][..]));
}

#[test]
fn push_rejects_wrong_dimension() {
    let mut dataset = Dataset::new(3).unwrap();
    let err = dataset.push(vec![1.0, 2.0]).unwrap_err();
    assert!(matches!(
        err,
        Error::DimensionMismatch {
            expected: 3,
            actual: 2
        }
    ));
    assert!(dataset.is_empty());
}

#[test]
fn from_vectors_validates_every_row() {
    let err = Dataset::from_vectors(2, vec![vec![1.0, 2.0], vec![1.0]]).unwrap_err();
    assert_eq!(err.code(), "SVG-001");

    let ok = Dataset::from_vectors(2, vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
    assert_eq!(ok.len(), 2);
    assert_eq!(ok.dim(), 2);
}

#[test]
fn empty_dataset_is_valid() {
    let dataset = Dataset::from_vectors(8, Vec::new()).unwrap();
    assert!(dataset.is_empty());
    assert_eq!(dataset.get(0), None);
}
