use drone_vo_tracker::normalizer::{
    DEFAULT_CONFIDENCE, DEFAULT_MATCHED_FEATURES, RawResponse, ShapeError, is_truthy, normalize,
    normalize_value,
};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde_json::json;

#[test]
fn test_normalize_transposes_points() {
    let t = normalize_value(json!({
        "trajectory": [[1, 2, 3], [4, 5, 6]],
        "confidence": [0.5, 0.9],
        "matchedFeatures": [50, 80]
    }))
    .unwrap();

    assert_eq!(t.x(), &[1.0, 4.0]);
    assert_eq!(t.y(), &[2.0, 5.0]);
    assert_eq!(t.z(), &[3.0, 6.0]);
    assert_eq!(t.confidence(), &[0.5, 0.9]);
    assert_eq!(t.matched_features(), &[50, 80]);
}

#[test]
fn test_single_point_defaults() {
    let t = normalize_value(json!({"trajectory": [[0, 0, 0]]})).unwrap();
    assert_eq!(t.x(), &[0.0]);
    assert_eq!(t.y(), &[0.0]);
    assert_eq!(t.z(), &[0.0]);
    assert_eq!(t.confidence(), &[0.8]);
    assert_eq!(t.matched_features(), &[100]);
}

#[test]
fn test_random_trajectories_keep_alignment() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..50 {
        let n = rng.random_range(0..40usize);
        let points: Vec<[f64; 3]> = (0..n)
            .map(|_| {
                [
                    rng.random_range(-100.0..100.0),
                    rng.random_range(-100.0..100.0),
                    rng.random_range(-100.0..100.0),
                ]
            })
            .collect();
        let with_metrics = rng.random_bool(0.5);
        let body = if with_metrics {
            let confidence: Vec<f64> = (0..n).map(|_| rng.random_range(0.0..1.0)).collect();
            let features: Vec<u64> = (0..n).map(|_| rng.random_range(0..500)).collect();
            json!({"trajectory": points, "confidence": confidence, "matchedFeatures": features})
        } else {
            json!({ "trajectory": points })
        };

        let t = normalize_value(body).unwrap();
        assert_eq!(t.len(), n);
        assert_eq!(t.y().len(), n);
        assert_eq!(t.z().len(), n);
        assert_eq!(t.confidence().len(), n);
        assert_eq!(t.matched_features().len(), n);
        for (i, p) in points.iter().enumerate() {
            assert_eq!(t.x()[i], p[0]);
            assert_eq!(t.y()[i], p[1]);
            assert_eq!(t.z()[i], p[2]);
        }
        if !with_metrics {
            assert!(t.confidence().iter().all(|&c| c == DEFAULT_CONFIDENCE));
            assert!(
                t.matched_features()
                    .iter()
                    .all(|&m| m == DEFAULT_MATCHED_FEATURES)
            );
        }
    }
}

#[test]
fn test_falsy_metrics_use_defaults() {
    for falsy in [json!(null), json!(false), json!(0), json!("")] {
        let t = normalize_value(json!({
            "trajectory": [[1, 1, 1], [2, 2, 2]],
            "confidence": falsy,
            "matchedFeatures": falsy
        }))
        .unwrap();
        assert_eq!(t.confidence(), &[0.8, 0.8]);
        assert_eq!(t.matched_features(), &[100, 100]);
    }
}

#[test]
fn test_empty_array_is_not_falsy() {
    assert!(is_truthy(&json!([])));
    let err = normalize_value(json!({"trajectory": [[1, 1, 1]], "confidence": []})).unwrap_err();
    assert_eq!(
        err,
        ShapeError::LengthMismatch {
            field: "confidence",
            expected: 1,
            found: 0
        }
    );
}

#[test]
fn test_empty_trajectory() {
    let t = normalize_value(json!({"trajectory": []})).unwrap();
    assert!(t.is_empty());
    assert!(t.confidence().is_empty());
}

#[test]
fn test_missing_trajectory() {
    assert_eq!(
        normalize_value(json!({"status": "done"})).unwrap_err(),
        ShapeError::MissingTrajectory
    );
    assert_eq!(
        normalize_value(json!({"trajectory": null})).unwrap_err(),
        ShapeError::MissingTrajectory
    );
}

#[test]
fn test_malformed_shapes() {
    assert_eq!(
        normalize_value(json!([[1, 2, 3]])).unwrap_err(),
        ShapeError::NotAnObject
    );
    assert_eq!(
        normalize_value(json!({"trajectory": "path"})).unwrap_err(),
        ShapeError::NotAnArray("trajectory")
    );
    assert_eq!(
        normalize_value(json!({"trajectory": [[1, 2, 3], [4, 5]]})).unwrap_err(),
        ShapeError::BadPoint { frame: 1 }
    );
    assert_eq!(
        normalize_value(json!({"trajectory": [[1, "2", 3]]})).unwrap_err(),
        ShapeError::BadValue {
            field: "trajectory",
            frame: 0,
            expected: "a number"
        }
    );
    assert_eq!(
        normalize_value(json!({"trajectory": [[1, 2, 3]], "confidence": "high"})).unwrap_err(),
        ShapeError::NotAnArray("confidence")
    );
}

#[test]
fn test_matched_features_must_be_counts() {
    let err = normalize_value(json!({
        "trajectory": [[0, 0, 0], [1, 1, 1]],
        "matchedFeatures": [10, -3]
    }))
    .unwrap_err();
    assert_eq!(
        err,
        ShapeError::BadValue {
            field: "matchedFeatures",
            frame: 1,
            expected: "a non-negative integer"
        }
    );

    // integral floats from the service are accepted
    let t = normalize_value(json!({
        "trajectory": [[0, 0, 0]],
        "matchedFeatures": [42.0]
    }))
    .unwrap();
    assert_eq!(t.matched_features(), &[42]);
}

#[test]
fn test_service_error_field() {
    let raw = RawResponse::from_value(json!({"error": "no features detected"})).unwrap();
    assert_eq!(raw.service_error().as_deref(), Some("no features detected"));

    let raw = RawResponse::from_value(json!({"error": "", "trajectory": []})).unwrap();
    assert_eq!(raw.service_error(), None);
    assert!(normalize(&raw).unwrap().is_empty());

    let raw = RawResponse::from_value(json!({"error": 404})).unwrap();
    assert_eq!(raw.service_error().as_deref(), Some("404"));
}
