use galleon::dataframe::DataFrame;
use galleon::expressions::{col, lit};
use galleon::series::Series;
use galleon::GalleonError;

fn sample() -> DataFrame {
    DataFrame::new(vec![
        Series::new_string(
            "g",
            ["a", "b", "a", "b", "a"].iter().map(|s| s.to_string()).collect(),
        ),
        Series::new_f64("v", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
        Series::new_i64("w", vec![10, 20, 30, 40, 50]),
    ])
    .unwrap()
}

#[test]
fn test_group_by_sum_scenario() {
    // GroupBy(g).Agg(sum(v)) over g = [a, b, a, b, a].
    let out = sample()
        .lazy()
        .group_by(vec!["g"])
        .agg(vec![col("v").sum()])
        .collect()
        .unwrap();
    assert_eq!(
        out.column_by_name("g").unwrap().str().unwrap(),
        &["a".to_string(), "b".to_string()]
    );
    assert_eq!(out.column_by_name("v_sum").unwrap().f64().unwrap(), &[9.0, 6.0]);
}

#[test]
fn test_output_rows_follow_first_occurrence() {
    let df = DataFrame::new(vec![
        Series::new_string(
            "g",
            ["z", "m", "z", "a", "m"].iter().map(|s| s.to_string()).collect(),
        ),
        Series::new_i64("v", vec![1, 2, 3, 4, 5]),
    ])
    .unwrap();
    let out = df
        .lazy()
        .group_by(vec!["g"])
        .agg(vec![col("v").count()])
        .collect()
        .unwrap();
    // Not sorted: first-occurrence order of the keys in the input.
    assert_eq!(
        out.column_by_name("g").unwrap().str().unwrap(),
        &["z".to_string(), "m".to_string(), "a".to_string()]
    );
    assert_eq!(out.column_by_name("v_count").unwrap().u32().unwrap(), &[2, 2, 1]);
}

#[test]
fn test_multiple_aggregations_with_aliases() {
    let out = sample()
        .lazy()
        .group_by(vec!["g"])
        .agg(vec![
            col("v").mean().alias("avg"),
            col("v").min(),
            col("v").max(),
            col("w").sum().alias("w_total"),
        ])
        .collect()
        .unwrap();
    assert_eq!(
        out.column_names(),
        vec!["g", "avg", "v_min", "v_max", "w_total"]
    );
    assert_eq!(out.column_by_name("avg").unwrap().f64().unwrap(), &[3.0, 3.0]);
    assert_eq!(out.column_by_name("v_min").unwrap().f64().unwrap(), &[1.0, 2.0]);
    assert_eq!(out.column_by_name("v_max").unwrap().f64().unwrap(), &[5.0, 4.0]);
    assert_eq!(out.column_by_name("w_total").unwrap().i64().unwrap(), &[90, 60]);
}

#[test]
fn test_multi_key_composite_groups() {
    let df = DataFrame::new(vec![
        Series::new_i64("a", vec![1, 1, 2, 1, 2]),
        Series::new_string(
            "b",
            ["x", "y", "x", "x", "x"].iter().map(|s| s.to_string()).collect(),
        ),
        Series::new_f64("v", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
    ])
    .unwrap();
    let out = df
        .lazy()
        .group_by(vec!["a", "b"])
        .agg(vec![col("v").sum()])
        .collect()
        .unwrap();
    assert_eq!(out.height(), 3);
    assert_eq!(out.column_by_name("a").unwrap().i64().unwrap(), &[1, 1, 2]);
    assert_eq!(
        out.column_by_name("b").unwrap().str().unwrap(),
        &["x".to_string(), "y".to_string(), "x".to_string()]
    );
    assert_eq!(out.column_by_name("v_sum").unwrap().f64().unwrap(), &[5.0, 2.0, 8.0]);
}

#[test]
fn test_statistics_per_group() {
    let out = sample()
        .lazy()
        .group_by(vec!["g"])
        .agg(vec![
            col("v").median(),
            col("v").var(),
            col("v").std(),
            col("v").quantile(1.0).alias("p100"),
        ])
        .collect()
        .unwrap();
    // Group "a" holds [1, 3, 5]; group "b" holds [2, 4]. The quantile is
    // nearest-rank, so the even-sized group reports its upper middle.
    assert_eq!(out.column_by_name("v_median").unwrap().f64().unwrap(), &[3.0, 4.0]);
    assert_eq!(out.column_by_name("v_var").unwrap().f64().unwrap(), &[4.0, 2.0]);
    let std = out.column_by_name("v_std").unwrap().f64().unwrap();
    assert!((std[0] - 2.0).abs() < 1e-12);
    assert_eq!(out.column_by_name("p100").unwrap().f64().unwrap(), &[5.0, 4.0]);
}

#[test]
fn test_group_corr() {
    let df = DataFrame::new(vec![
        Series::new_string(
            "g",
            ["a", "a", "a", "b", "b", "b"].iter().map(|s| s.to_string()).collect(),
        ),
        Series::new_f64("x", vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0]),
        Series::new_f64("y", vec![2.0, 4.0, 6.0, 6.0, 4.0, 2.0]),
    ])
    .unwrap();
    let out = df
        .lazy()
        .group_by(vec!["g"])
        .agg(vec![col("x").corr(col("y"))])
        .collect()
        .unwrap();
    let r = out.column_by_name("x_corr").unwrap().f64().unwrap();
    assert!((r[0] - 1.0).abs() < 1e-6);
    assert!((r[1] + 1.0).abs() < 1e-6);
}

#[test]
fn test_var_on_single_row_group_is_domain_error() {
    let df = DataFrame::new(vec![
        Series::new_string("g", vec!["a".to_string(), "b".to_string()]),
        Series::new_f64("v", vec![1.0, 2.0]),
    ])
    .unwrap();
    let err = df
        .lazy()
        .group_by(vec!["g"])
        .agg(vec![col("v").var()])
        .collect()
        .unwrap_err();
    assert!(matches!(err, GalleonError::DomainError(_)));
}

#[test]
fn test_aggregating_computed_expression() {
    let out = sample()
        .lazy()
        .group_by(vec!["g"])
        .agg(vec![(col("v") * lit(2.0)).sum().alias("doubled")])
        .collect()
        .unwrap();
    assert_eq!(out.column_by_name("doubled").unwrap().f64().unwrap(), &[18.0, 12.0]);
}

#[test]
fn test_float_nan_groups_together() {
    let df = DataFrame::new(vec![
        Series::new_f64("k", vec![1.0, f64::NAN, 1.0, f64::NAN]),
        Series::new_i64("v", vec![1, 2, 3, 4]),
    ])
    .unwrap();
    let out = df
        .lazy()
        .group_by(vec!["k"])
        .agg(vec![col("v").count()])
        .collect()
        .unwrap();
    assert_eq!(out.height(), 2);
    assert_eq!(out.column_by_name("v_count").unwrap().u32().unwrap(), &[2, 2]);
}

#[test]
fn test_non_aggregation_expression_rejected() {
    let err = sample()
        .lazy()
        .group_by(vec!["g"])
        .agg(vec![col("v") + lit(1.0)])
        .collect()
        .unwrap_err();
    assert!(matches!(err, GalleonError::UnsupportedDType(_)));
}
