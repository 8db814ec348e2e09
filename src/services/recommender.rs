use crate::{
    error::{AppError, AppResult},
    models::{DimensionMismatch, FeatureVector, RankedResult, Recommendation, ScoredItem},
};

/// Distance reported when either vector has zero magnitude
///
/// Cosine distance lives in `[0, 2]`, so such pairs always rank last.
pub const ZERO_MAGNITUDE_DISTANCE: f64 = 3.0;

/// Distances closer than this rank as equal and fall back to the id order
pub const DISTANCE_RESOLUTION: f64 = 1e-12;

/// Cosine distance `1 - (a·b) / (|a| |b|)`, clamped to `[0, 2]`
///
/// Callers must pass vectors of equal length.
pub fn cosine_distance(a: &FeatureVector, b: &FeatureVector) -> f64 {
    let norms = a.magnitude() * b.magnitude();
    if norms == 0.0 || !norms.is_finite() {
        return ZERO_MAGNITUDE_DISTANCE;
    }

    let distance = 1.0 - a.dot(b) / norms;
    if distance.is_nan() {
        return ZERO_MAGNITUDE_DISTANCE;
    }
    distance.clamp(0.0, 2.0)
}

/// Converts a caller-supplied count into a ranking limit
pub fn validate_top_n(top_n: i64) -> AppResult<usize> {
    usize::try_from(top_n)
        .map_err(|_| AppError::InvalidInput(format!("top_n must be >= 0, got {}", top_n)))
}

/// Ranks `catalog` against `query`, most similar first
///
/// Entries whose vector length differs from the query are excluded and
/// reported in `mismatches`. Equal distances are ordered by ascending item id.
pub fn recommend(query: &FeatureVector, catalog: &[ScoredItem], top_n: usize) -> RankedResult {
    let mut mismatches = Vec::new();
    let mut ranked: Vec<Recommendation> = Vec::with_capacity(catalog.len());

    for scored in catalog {
        if scored.features.len() != query.len() {
            mismatches.push(DimensionMismatch {
                item_id: scored.item.id.clone(),
                expected: query.len(),
                actual: scored.features.len(),
            });
            continue;
        }

        ranked.push(Recommendation {
            item: scored.item.clone(),
            distance: cosine_distance(query, &scored.features),
        });
    }

    if !mismatches.is_empty() {
        tracing::warn!(
            excluded = mismatches.len(),
            expected = query.len(),
            "Catalog vectors with mismatched dimensions excluded from ranking"
        );
    }

    ranked.sort_by(|a, b| {
        rank_key(a.distance)
            .total_cmp(&rank_key(b.distance))
            .then_with(|| a.item.id.cmp(&b.item.id))
    });
    ranked.truncate(top_n);

    mismatches.sort_by(|a, b| a.item_id.cmp(&b.item_id));

    RankedResult {
        recommendations: ranked,
        mismatches,
    }
}

/// Snaps a distance onto the [`DISTANCE_RESOLUTION`] grid
///
/// Rounding error in the cosine of parallel vectors stays below the grid, so
/// covers of the same hue compare equal instead of ordering by noise.
fn rank_key(distance: f64) -> f64 {
    (distance / DISTANCE_RESOLUTION).round()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogItem, ItemId};

    fn vector(values: &[f64]) -> FeatureVector {
        FeatureVector::new(values.to_vec())
    }

    fn scored(id: i64, values: &[f64]) -> ScoredItem {
        ScoredItem::new(
            CatalogItem::new(id, format!("Movie {}", id), "Drama", format!("{}.png", id)),
            vector(values),
        )
    }

    fn assert_sorted(result: &RankedResult) {
        for pair in result.recommendations.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let (ka, kb) = (rank_key(a.distance), rank_key(b.distance));
            assert!(
                ka < kb || (ka == kb && a.item.id < b.item.id),
                "out of order: {:?} then {:?}",
                a,
                b
            );
        }
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        for values in [[10.0, 10.0, 10.0], [200.0, 0.0, 0.0], [0.1, 254.9, 3.3]] {
            let a = vector(&values);
            assert!(cosine_distance(&a, &a).abs() < 1e-12);
        }
    }

    #[test]
    fn test_distance_is_symmetric() {
        let pairs = [
            (vector(&[10.0, 10.0, 11.0]), vector(&[200.0, 0.0, 0.0])),
            (vector(&[1.0, 2.0, 3.0]), vector(&[3.0, 2.0, 1.0])),
            (vector(&[0.0, 0.0, 0.0]), vector(&[1.0, 1.0, 1.0])),
        ];
        for (a, b) in pairs {
            assert_eq!(cosine_distance(&a, &b), cosine_distance(&b, &a));
        }
    }

    #[test]
    fn test_zero_vector_uses_sentinel() {
        let zero = vector(&[0.0, 0.0, 0.0]);
        let other = vector(&[5.0, 1.0, 0.0]);
        assert_eq!(cosine_distance(&zero, &other), ZERO_MAGNITUDE_DISTANCE);
        assert_eq!(cosine_distance(&zero, &zero), ZERO_MAGNITUDE_DISTANCE);
        assert!(!cosine_distance(&zero, &zero).is_nan());
    }

    #[test]
    fn test_opposite_vectors_are_maximally_distant() {
        let a = vector(&[1.0, 0.0]);
        let b = vector(&[-1.0, 0.0]);
        assert!((cosine_distance(&a, &b) - 2.0).abs() < 1e-12);
        assert!(cosine_distance(&a, &b) < ZERO_MAGNITUDE_DISTANCE);
    }

    #[test]
    fn test_validate_top_n() {
        assert_eq!(validate_top_n(0).unwrap(), 0);
        assert_eq!(validate_top_n(5).unwrap(), 5);
        assert!(matches!(validate_top_n(-1), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_recommend_example_ranking() {
        let catalog = vec![
            scored(1, &[10.0, 10.0, 10.0]),
            scored(2, &[200.0, 0.0, 0.0]),
            scored(3, &[10.0, 10.0, 11.0]),
        ];

        let result = recommend(&vector(&[10.0, 10.0, 10.0]), &catalog, 2);

        assert_eq!(result.ids(), vec![ItemId::Int(1), ItemId::Int(3)]);
        assert!(result.recommendations[0].distance.abs() < 1e-12);
        assert!(result.recommendations[1].distance > 0.0);
        assert!(result.mismatches.is_empty());
    }

    #[test]
    fn test_recommend_top_zero_is_empty() {
        let catalog = vec![scored(1, &[1.0, 2.0, 3.0])];
        let result = recommend(&vector(&[1.0, 2.0, 3.0]), &catalog, 0);
        assert!(result.recommendations.is_empty());
    }

    #[test]
    fn test_recommend_top_n_larger_than_catalog() {
        let catalog = vec![scored(1, &[1.0, 2.0, 3.0]), scored(2, &[3.0, 2.0, 1.0])];
        let result = recommend(&vector(&[1.0, 1.0, 1.0]), &catalog, 50);
        assert_eq!(result.recommendations.len(), 2);
    }

    #[test]
    fn test_recommend_empty_catalog() {
        let result = recommend(&vector(&[1.0, 1.0, 1.0]), &[], 5);
        assert!(result.recommendations.is_empty());
    }

    #[test]
    fn test_recommend_ties_broken_by_id() {
        let catalog = vec![
            scored(9, &[2.0, 2.0, 2.0]),
            scored(3, &[2.0, 2.0, 2.0]),
            scored(7, &[2.0, 2.0, 2.0]),
            scored(1, &[9.0, 0.0, 0.0]),
        ];

        let result = recommend(&vector(&[4.0, 4.0, 4.0]), &catalog, 4);

        assert_eq!(
            result.ids(),
            vec![ItemId::Int(3), ItemId::Int(7), ItemId::Int(9), ItemId::Int(1)]
        );
        assert_sorted(&result);
    }

    #[test]
    fn test_recommend_sorted_for_every_top_n() {
        let catalog: Vec<ScoredItem> = (0..12)
            .map(|i| {
                let f = i as f64;
                scored(11 - i, &[f % 4.0, (f * 7.0) % 5.0, 1.0 + (f % 3.0)])
            })
            .chain(std::iter::once(scored(40, &[0.0, 0.0, 0.0])))
            .collect();
        let query = vector(&[1.0, 3.0, 2.0]);

        for top_n in 0..=catalog.len() + 2 {
            let result = recommend(&query, &catalog, top_n);
            assert_eq!(result.recommendations.len(), top_n.min(catalog.len()));
            assert_sorted(&result);
        }

        // zero-magnitude entry ranks last
        let all = recommend(&query, &catalog, catalog.len());
        assert_eq!(all.recommendations.last().unwrap().item.id, ItemId::Int(40));
    }

    #[test]
    fn test_recommend_excludes_dimension_mismatch() {
        let catalog = vec![
            scored(1, &[1.0, 1.0, 1.0]),
            scored(2, &[1.0, 1.0, 1.0, 1.0, 1.0, 1.0]),
            scored(3, &[1.0, 2.0, 1.0]),
        ];

        let result = recommend(&vector(&[1.0, 1.0, 1.0]), &catalog, 10);

        assert_eq!(result.ids(), vec![ItemId::Int(1), ItemId::Int(3)]);
        assert_eq!(
            result.mismatches,
            vec![DimensionMismatch {
                item_id: ItemId::Int(2),
                expected: 3,
                actual: 6,
            }]
        );
    }

    #[test]
    fn test_parallel_vectors_tie_on_id() {
        let catalog = vec![
            scored(2, &[10.0, 20.0, 30.0]),
            scored(1, &[80.0, 160.0, 240.0]),
        ];

        let result = recommend(&vector(&[10.0, 20.0, 30.0]), &catalog, 2);

        assert_eq!(result.ids(), vec![ItemId::Int(1), ItemId::Int(2)]);
    }

    #[test]
    fn test_scaled_copies_rank_by_id() {
        let base = [10.0, 20.0, 30.0];
        let catalog: Vec<ScoredItem> = (1..=8_i64)
            .rev()
            .map(|k| {
                let scale = k as f64;
                scored(k, &[base[0] * scale, base[1] * scale, base[2] * scale])
            })
            .collect();

        let result = recommend(&vector(&base), &catalog, 8);

        let expected: Vec<ItemId> = (1..=8).map(ItemId::Int).collect();
        assert_eq!(result.ids(), expected);
        assert!(result.recommendations.iter().all(|r| r.distance < DISTANCE_RESOLUTION));
    }
}
