use super::*;

fn hit_indices(hits: &[SearchHit]) -> Vec<usize> {
    hits.iter().map(|h| h.chunk_index).collect()
}

/// Points on a line at x = 0, 1, 3, 6, 10 so every pairwise distance is known
fn line_index() -> VectorIndex {
    VectorIndex::build(&[
        vec![0.0, 0.0],
        vec![1.0, 0.0],
        vec![3.0, 0.0],
        vec![6.0, 0.0],
        vec![10.0, 0.0],
    ])
    .expect("index should build")
}

#[test]
fn l2_distance_values() {
    assert_eq!(l2_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
    assert_eq!(l2_distance(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 0.0);
    assert!((l2_distance(&[1.0, 0.0], &[0.0, 1.0]) - 2.0_f32.sqrt()).abs() < 1e-6);
}

#[test]
fn build_records_shape() {
    let index = line_index();
    assert_eq!(index.len(), 5);
    assert_eq!(index.dimension(), 2);
    assert!(!index.is_empty());
}

#[test]
fn top_k_for_various_k() {
    let index = line_index();
    let query = [2.6, 0.0];

    let expected_order = vec![2, 1, 0, 3, 4];
    for k in 1..=5 {
        let hits = index.search(&query, k).expect("search");
        assert_eq!(hit_indices(&hits), expected_order[..k].to_vec(), "k = {k}");
    }
}

#[test]
fn k_larger_than_index_returns_everything_sorted() {
    let index = line_index();
    let hits = index.search(&[9.0, 0.0], 50).expect("search");

    assert_eq!(hit_indices(&hits), vec![4, 3, 2, 1, 0]);
    assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    assert!((hits[0].distance - 1.0).abs() < 1e-6);
    assert!((hits[4].distance - 9.0).abs() < 1e-6);
}

#[test]
fn zero_k_returns_nothing() {
    let index = line_index();
    assert!(index.search(&[0.0, 0.0], 0).expect("search").is_empty());
}

#[test]
fn ties_keep_insertion_order() {
    let index = VectorIndex::build(&[
        vec![0.0, 1.0],
        vec![1.0, 0.0],
        vec![0.0, -1.0],
        vec![-1.0, 0.0],
        vec![5.0, 5.0],
    ])
    .expect("index should build");

    let hits = index.search(&[0.0, 0.0], 4).expect("search");
    assert_eq!(hit_indices(&hits), vec![0, 1, 2, 3]);

    let hits = index.search(&[0.0, 0.0], 2).expect("search");
    assert_eq!(hit_indices(&hits), vec![0, 1]);
}

#[test]
fn nearest_of_two_orthogonal_vectors() {
    let index = VectorIndex::build(&[vec![1.0, 0.0], vec![0.0, 1.0]]).expect("build");
    let hits = index.search(&[0.9, 0.1], 1).expect("search");

    assert_eq!(hit_indices(&hits), vec![0]);
}

#[test]
fn mismatched_vectors_fail_to_build() {
    let result = VectorIndex::build(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0, 1.0]]);

    assert!(matches!(
        result,
        Err(RagError::DimensionMismatch {
            expected: 2,
            found: 3,
            position: 2
        })
    ));
}

#[test]
fn degenerate_inputs_fail_to_build() {
    assert!(matches!(
        VectorIndex::build(&[]),
        Err(RagError::EmptyDocument)
    ));
    assert!(matches!(
        VectorIndex::build(&[Vec::new()]),
        Err(RagError::Embedding(_))
    ));
}

#[test]
fn query_dimension_is_checked() {
    let index = line_index();
    let result = index.search(&[1.0, 2.0, 3.0], 2);

    assert!(matches!(
        result,
        Err(RagError::DimensionMismatch {
            expected: 2,
            found: 3,
            ..
        })
    ));
}

#[test]
fn non_finite_vectors_fail_to_build() {
    let infinite = VectorIndex::build(&[
        vec![f32::INFINITY, 0.0],
        vec![0.0, 0.0],
        vec![0.5, 0.0],
    ]);
    assert!(matches!(infinite, Err(RagError::Embedding(_))));

    let nan = VectorIndex::build(&[vec![0.0, 0.0], vec![-f32::NAN, 0.0]]);
    let Err(RagError::Embedding(message)) = nan else {
        panic!("expected an embedding error, got {nan:?}");
    };
    assert!(message.contains("vector 1"));
}

#[test]
fn non_finite_query_is_rejected() {
    let index = line_index();

    assert!(matches!(
        index.search(&[f32::INFINITY, 0.0], 1),
        Err(RagError::Embedding(_))
    ));
    assert!(matches!(
        index.search(&[f32::NAN, 0.0], 1),
        Err(RagError::Embedding(_))
    ));
}
