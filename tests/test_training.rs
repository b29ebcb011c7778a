//! Integration test: forest training end-to-end

use forest_insight::optimizer::{SearchConfig, SearchSpace};
use forest_insight::training::{
    rmse, train_classifier, train_regressor, ClassLabel, ClassWeight, ForestParams, MaxFeatures, RandomForest,
    TaskType, TrainOptions, MAX_SAMPLES_CAP,
};
use forest_insight::utils::{features_to_array2, series_to_array1};
use forest_insight::InsightError;
use polars::prelude::*;

fn classification_df() -> DataFrame {
    df!(
        "f1" => &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0,
                   1.5, 2.5, 3.5, 4.5, 5.5, 6.5, 7.5, 8.5, 9.5, 10.5],
        "f2" => &[10.0, 9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0,
                   9.5, 8.5, 7.5, 6.5, 5.5, 4.5, 3.5, 2.5, 1.5, 0.5],
        "target" => &[0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0,
                      0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0]
    )
    .unwrap()
}

fn regression_df() -> DataFrame {
    df!(
        "x1" => &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0,
                   11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0, 18.0, 19.0, 20.0],
        "x2" => &[2.0, 4.0, 6.0, 8.0, 10.0, 12.0, 14.0, 16.0, 18.0, 20.0,
                   22.0, 24.0, 26.0, 28.0, 30.0, 32.0, 34.0, 36.0, 38.0, 40.0],
        "target" => &[3.0, 6.0, 9.0, 12.0, 15.0, 18.0, 21.0, 24.0, 27.0, 30.0,
                      33.0, 36.0, 39.0, 42.0, 45.0, 48.0, 51.0, 54.0, 57.0, 60.0]
    )
    .unwrap()
}

fn split(df: &DataFrame) -> (DataFrame, Series) {
    let features = df.drop("target").unwrap();
    let target = df.column("target").unwrap().as_materialized_series().clone();
    (features, target)
}

#[test]
fn test_regressor_direct_fit() {
    let (x, y) = split(&regression_df());
    let model = train_regressor(&x, &y, None, &TrainOptions::default()).unwrap();

    assert_eq!(model.task(), TaskType::Regression);
    assert_eq!(model.max_samples, Some(20.min(MAX_SAMPLES_CAP)));
    assert_eq!(model.n_trees(), 40);

    let preds = model.predict(&features_to_array2(&x).unwrap()).unwrap();
    let truth = series_to_array1(&y).unwrap();
    assert!(rmse(&truth, &preds) < 15.0);
}

#[test]
fn test_classifier_direct_fit() {
    let (x, y) = split(&classification_df());
    let model = train_classifier(&x, &y, None, &TrainOptions::default()).unwrap();

    assert_eq!(model.class_weight, Some(ClassWeight::Balanced));
    assert_eq!(model.classes(), &[0.0, 1.0]);

    let proba = model.predict_proba(&features_to_array2(&x).unwrap()).unwrap();
    assert_eq!(proba.ncols(), 2);
    for row in proba.rows() {
        assert!((row.sum() - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_hypertuned_regressor_with_validation() {
    let (x, y) = split(&regression_df());
    let x_val = df!("x1" => &[2.5, 12.5], "x2" => &[5.0, 25.0]).unwrap();
    let y_val = Series::new("target".into(), &[7.5, 37.5]);

    let space = SearchSpace::new()
        .int("n_estimators", 5, 15)
        .int("max_depth", 2, 6);
    let options = TrainOptions::new()
        .with_hypertune(4)
        .with_search_space(space)
        .with_search_config(SearchConfig::new().with_random_state(7));

    let model = train_regressor(&x, &y, Some((&x_val, &y_val)), &options).unwrap();

    assert!((5..=15).contains(&model.n_trees()));
    assert!(matches!(model.max_depth, Some(d) if (2..=6).contains(&d)));
    // Untuned knobs come from estimator defaults
    assert_eq!(model.min_samples_leaf, 1);
    assert_eq!(model.max_features, MaxFeatures::All);
}

#[test]
fn test_hypertuned_classifier_without_validation() {
    let (x, y) = split(&classification_df());
    let space = SearchSpace::new().int("n_estimators", 3, 8);
    let options = TrainOptions::new().with_hypertune(3).with_search_space(space);

    let model = train_classifier(&x, &y, None, &options).unwrap();

    assert_eq!(model.class_weight, Some(ClassWeight::Balanced));
    assert_eq!(model.max_features, MaxFeatures::Sqrt);
}

#[test]
fn test_unknown_search_parameter() {
    let (x, y) = split(&regression_df());
    let space = SearchSpace::new().float("learning_rate", 0.01, 0.1);
    let options = TrainOptions::new().with_hypertune(2).with_search_space(space);

    assert!(train_regressor(&x, &y, None, &options).is_err());
}

#[test]
fn test_regressor_rejects_class_weight() {
    let (x, y) = split(&regression_df());
    let options = TrainOptions::new()
        .with_params(ForestParams::default().with_class_weight(ClassWeight::Balanced));

    let err = train_regressor(&x, &y, None, &options).unwrap_err();
    assert!(matches!(err, InsightError::InvalidParameter { .. }));
}

#[test]
fn test_nulls_rejected() {
    let x = df!("a" => &[Some(1.0), None, Some(3.0)]).unwrap();
    let y = Series::new("y".into(), &[1.0, 2.0, 3.0]);
    let err = train_regressor(&x, &y, None, &TrainOptions::default()).unwrap_err();
    assert!(matches!(err, InsightError::DataError(_)));
}

#[test]
fn test_save_and_load() {
    let (x, y) = split(&regression_df());
    let options = TrainOptions::new().with_params(ForestParams::default().with_n_estimators(5));
    let model = train_regressor(&x, &y, None, &options).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("forest.json");
    let path = path.to_str().unwrap();
    model.save(path).unwrap();
    let loaded = RandomForest::load(path).unwrap();

    let xa = features_to_array2(&x).unwrap();
    assert_eq!(model.predict(&xa).unwrap(), loaded.predict(&xa).unwrap());
}

#[test]
fn test_classifier_on_text_labels() {
    let x = df!(
        "f1" => &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0,
                   1.5, 2.5, 3.5, 4.5, 5.5, 6.5, 7.5, 8.5, 9.5, 10.5]
    )
    .unwrap();
    let labels: Vec<&str> = (0..20).map(|i| if i % 10 < 5 { "no" } else { "yes" }).collect();
    let y = Series::new("default".into(), labels);

    let x_val = df!("f1" => &[1.2, 9.8]).unwrap();
    let y_val = Series::new("default".into(), &["no", "yes"]);
    let space = SearchSpace::new().int("n_estimators", 5, 10);
    let options = TrainOptions::new().with_hypertune(2).with_search_space(space);

    let model = train_classifier(&x, &y, Some((&x_val, &y_val)), &options).unwrap();

    assert_eq!(model.class_labels(), &[ClassLabel::from("no"), ClassLabel::from("yes")]);
    let predicted = model.predict_labels(&features_to_array2(&x_val).unwrap()).unwrap();
    assert_eq!(predicted, vec![ClassLabel::from("no"), ClassLabel::from("yes")]);
}
