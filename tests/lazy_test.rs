use galleon::dataframe::DataFrame;
use galleon::expressions::{col, lit, Expr};
use galleon::lazy::LazyFrame;
use galleon::series::Series;
use galleon::types::DType;
use galleon::GalleonError;

fn sample() -> DataFrame {
    DataFrame::new(vec![
        Series::new_i64("id", vec![1, 2, 3, 4, 5]),
        Series::new_f64("x", vec![10.0, 20.0, 30.0, 40.0, 50.0]),
        Series::new_string(
            "tag",
            ["a", "b", "a", "b", "a"].iter().map(|s| s.to_string()).collect(),
        ),
    ])
    .unwrap()
}

/// Optimization must preserve semantics: collect() and
/// collect_unoptimized() agree elementwise.
fn assert_optimizer_equivalent(lf: LazyFrame) -> DataFrame {
    let optimized = lf.clone().collect().unwrap();
    let unoptimized = lf.collect_unoptimized().unwrap();
    assert!(
        optimized.frame_equal(&unoptimized),
        "optimized {:?} != unoptimized {:?}",
        optimized,
        unoptimized
    );
    optimized
}

#[test]
fn test_filter_sum_scenario() {
    // Filter(x > 20) then Select(sum(x)) over x = 10..50.
    let out = assert_optimizer_equivalent(
        sample()
            .lazy()
            .filter(col("x").gt(lit(20.0)))
            .select(vec![col("x").sum()]),
    );
    assert_eq!(out.height(), 1);
    assert_eq!(out.column_by_name("x_sum").unwrap().f64().unwrap(), &[120.0]);
}

#[test]
fn test_filter_true_is_noop() {
    let out = assert_optimizer_equivalent(sample().lazy().filter(lit(true)));
    assert!(out.frame_equal(&sample()));
}

#[test]
fn test_filter_false_keeps_schema() {
    let out = assert_optimizer_equivalent(sample().lazy().filter(lit(false)));
    assert_eq!(out.height(), 0);
    assert_eq!(out.schema(), sample().schema());
}

#[test]
fn test_select_all_cols_is_noop() {
    let out = assert_optimizer_equivalent(sample().lazy().select(vec![Expr::AllCols]));
    assert!(out.frame_equal(&sample()));
}

#[test]
fn test_select_reorders_and_computes() {
    let out = assert_optimizer_equivalent(sample().lazy().select(vec![
        col("x"),
        (col("id") * lit(2i64)).alias("id2"),
    ]));
    assert_eq!(out.column_names(), vec!["x", "id2"]);
    assert_eq!(
        out.column_by_name("id2").unwrap().i64().unwrap(),
        &[2, 4, 6, 8, 10]
    );
}

#[test]
fn test_with_column_appends_and_replaces() {
    let out = assert_optimizer_equivalent(
        sample()
            .lazy()
            .with_column((col("x") * lit(10.0)).alias("x10")),
    );
    assert_eq!(out.width(), 4);
    assert_eq!(
        out.column_by_name("x10").unwrap().f64().unwrap(),
        &[100.0, 200.0, 300.0, 400.0, 500.0]
    );

    // Replacing an existing column keeps the width.
    let out = assert_optimizer_equivalent(
        sample().lazy().with_column((col("x") + lit(1.0)).alias("x")),
    );
    assert_eq!(out.width(), 3);
    assert_eq!(
        out.column_by_name("x").unwrap().f64().unwrap(),
        &[11.0, 21.0, 31.0, 41.0, 51.0]
    );
}

#[test]
fn test_projection_then_filter_scenario() {
    // The optimizer rewrites Select(a, b).Filter(a > 0) into
    // Filter(a > 0).Select(a, b); both shapes agree on the result.
    let out = assert_optimizer_equivalent(
        sample()
            .lazy()
            .select(vec![col("id"), col("x")])
            .filter(col("id").gt(lit(2i64))),
    );
    assert_eq!(out.column_names(), vec!["id", "x"]);
    assert_eq!(out.column_by_name("id").unwrap().i64().unwrap(), &[3, 4, 5]);
}

#[test]
fn test_sort_and_limit_fuse_to_top_k() {
    let out = assert_optimizer_equivalent(
        sample()
            .lazy()
            .sort(vec!["x"], vec![true])
            .limit(2),
    );
    assert_eq!(out.column_by_name("x").unwrap().f64().unwrap(), &[50.0, 40.0]);
}

#[test]
fn test_select_literal_keeps_height() {
    let out =
        assert_optimizer_equivalent(sample().lazy().select(vec![lit(1i64).alias("one")]));
    assert_eq!(out.height(), 5);
    assert_eq!(out.column_by_name("one").unwrap().i64().unwrap(), &[1, 1, 1, 1, 1]);
}

#[test]
fn test_limit_clamps() {
    let out = assert_optimizer_equivalent(sample().lazy().limit(99));
    assert_eq!(out.height(), 5);
}

#[test]
fn test_sort_multi_key_with_directions() {
    let out = assert_optimizer_equivalent(
        sample()
            .lazy()
            .sort(vec!["tag", "x"], vec![false, true]),
    );
    assert_eq!(
        out.column_by_name("tag").unwrap().str().unwrap(),
        &["a".to_string(), "a".to_string(), "a".to_string(), "b".to_string(), "b".to_string()]
    );
    assert_eq!(
        out.column_by_name("x").unwrap().f64().unwrap(),
        &[50.0, 30.0, 10.0, 40.0, 20.0]
    );
}

#[test]
fn test_cast_in_plan() {
    let out = assert_optimizer_equivalent(
        sample()
            .lazy()
            .select(vec![col("x").cast(DType::I32).alias("xi")]),
    );
    assert_eq!(out.column_by_name("xi").unwrap().i32().unwrap(), &[10, 20, 30, 40, 50]);
}

#[test]
fn test_correlation_scenarios() {
    let df = DataFrame::new(vec![
        Series::new_f64("x", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
        Series::new_f64("y", vec![2.0, 4.0, 6.0, 8.0, 10.0]),
        Series::new_f64("z", vec![10.0, 8.0, 6.0, 4.0, 2.0]),
        Series::new_f64("flat", vec![1.0, 1.0, 1.0, 1.0, 1.0]),
    ])
    .unwrap();

    let out = df
        .clone()
        .lazy()
        .select(vec![col("x").corr(col("y")), col("x").corr(col("z")).alias("neg")])
        .collect()
        .unwrap();
    let pos = out.column_by_name("x_corr").unwrap().f64().unwrap()[0];
    let neg = out.column_by_name("neg").unwrap().f64().unwrap()[0];
    assert!((pos - 1.0).abs() < 1e-6);
    assert!((neg + 1.0).abs() < 1e-6);

    let err = df
        .lazy()
        .select(vec![col("x").corr(col("flat"))])
        .collect()
        .unwrap_err();
    assert!(matches!(err, GalleonError::DomainError(_)));
}

#[test]
fn test_validation_missing_column() {
    let err = sample()
        .lazy()
        .filter(col("nope").gt(lit(0i64)))
        .collect()
        .unwrap_err();
    assert_eq!(err, GalleonError::ColumnNotFound("nope".to_string()));
}

#[test]
fn test_validation_duplicate_output() {
    let err = sample()
        .lazy()
        .select(vec![col("x"), col("id").alias("x")])
        .collect()
        .unwrap_err();
    assert!(matches!(err, GalleonError::DuplicateColumn(_)));
}

#[test]
fn test_validation_type_promotion() {
    let err = sample()
        .lazy()
        .select(vec![col("tag") + lit(1i64)])
        .collect()
        .unwrap_err();
    assert!(matches!(err, GalleonError::TypePromotion(_)));
}

#[test]
fn test_validation_non_boolean_predicate() {
    let err = sample().lazy().filter(col("x") + lit(1.0)).collect().unwrap_err();
    assert!(matches!(err, GalleonError::DTypeMismatch(_)));
}

#[test]
fn test_schema_inference() {
    let lf = sample()
        .lazy()
        .group_by(vec!["tag"])
        .agg(vec![col("x").sum(), col("id").count()]);
    let schema = lf.schema().unwrap();
    assert_eq!(schema.names(), vec!["tag", "x_sum", "id_count"]);
    assert_eq!(schema.dtypes(), vec![DType::Str, DType::F64, DType::U32]);
}

#[test]
fn test_chained_filters_fuse_and_agree() {
    let out = assert_optimizer_equivalent(
        sample()
            .lazy()
            .filter(col("x").gt(lit(10.0)))
            .filter(col("x").lt(lit(50.0)))
            .filter(col("id").neq(lit(3i64))),
    );
    assert_eq!(out.column_by_name("id").unwrap().i64().unwrap(), &[2, 4]);
}

#[test]
fn test_modulo_and_division() {
    let out = assert_optimizer_equivalent(sample().lazy().select(vec![
        (col("id") % lit(2i64)).alias("parity"),
        (col("x") / lit(4.0)).alias("quarter"),
    ]));
    assert_eq!(
        out.column_by_name("parity").unwrap().i64().unwrap(),
        &[1, 0, 1, 0, 1]
    );
    assert_eq!(
        out.column_by_name("quarter").unwrap().f64().unwrap(),
        &[2.5, 5.0, 7.5, 10.0, 12.5]
    );
}

#[test]
fn test_integer_division_by_zero_is_domain_error() {
    let err = sample()
        .lazy()
        .select(vec![col("id") / lit(0i64)])
        .collect()
        .unwrap_err();
    assert!(matches!(err, GalleonError::DomainError(_)));
}
