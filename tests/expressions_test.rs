use galleon::expressions::{col, lit, Expr};
use galleon::types::DType;

#[test]
fn test_display_column_and_literal() {
    assert_eq!(col("x").to_string(), "col(\"x\")");
    assert_eq!(lit(3i64).to_string(), "3");
    assert_eq!(lit(3.5).to_string(), "3.5");
    assert_eq!(lit("hi").to_string(), "\"hi\"");
    assert_eq!(lit(true).to_string(), "true");
}

#[test]
fn test_display_binary_shapes() {
    let expr = (col("x") + lit(1i64)).gt(lit(3i64));
    assert_eq!(expr.to_string(), "((col(\"x\") + 1) > 3)");

    let expr = col("a").lt_eq(col("b")).and(col("c").neq(lit(0i64)));
    assert_eq!(
        expr.to_string(),
        "((col(\"a\") <= col(\"b\")) & (col(\"c\") != 0))"
    );

    let expr = col("x") % lit(2i64);
    assert_eq!(expr.to_string(), "(col(\"x\") % 2)");
}

#[test]
fn test_display_aggregations() {
    assert_eq!(col("x").sum().to_string(), "col(\"x\").sum()");
    assert_eq!(col("x").quantile(0.5).to_string(), "col(\"x\").quantile(0.5)");
    assert_eq!(
        col("a").corr(col("b")).to_string(),
        "corr(col(\"a\"), col(\"b\"))"
    );
    assert_eq!(col("x").kurt().to_string(), "col(\"x\").kurt()");
}

#[test]
fn test_display_cast_alias_allcols() {
    assert_eq!(col("x").cast(DType::F64).to_string(), "col(\"x\").cast(f64)");
    assert_eq!(col("x").alias("y").to_string(), "col(\"x\").alias(\"y\")");
    assert_eq!(Expr::AllCols.to_string(), "*");
}

#[test]
fn test_structural_equality() {
    let a = (col("x") + lit(1i64)).gt(lit(3i64));
    let b = (col("x") + lit(1i64)).gt(lit(3i64));
    assert_eq!(a, b);
    let c = (col("x") + lit(2i64)).gt(lit(3i64));
    assert_ne!(a, c);
}

#[test]
fn test_root_columns_deduplicated() {
    let expr = (col("x") + col("y")).gt(col("x"));
    assert_eq!(expr.root_columns(), vec!["x".to_string(), "y".to_string()]);
    assert_eq!(
        col("a").corr(col("b")).root_columns(),
        vec!["a".to_string(), "b".to_string()]
    );
}

#[test]
fn test_output_names() {
    assert_eq!(col("v").sum().output_name(), Some("v_sum".to_string()));
    assert_eq!(col("v").quantile(0.9).output_name(), Some("v_quantile".to_string()));
    assert_eq!(
        col("v").sum().alias("total").output_name(),
        Some("total".to_string())
    );
    assert_eq!((col("x") + lit(1i64)).output_name(), Some("x".to_string()));
    assert_eq!(lit(1i64).output_name(), Some("literal".to_string()));
    assert_eq!(Expr::AllCols.output_name(), None);
}

#[test]
fn test_aggregation_detection() {
    assert!(col("x").sum().has_aggregation());
    assert!((col("x").sum() + lit(1i64)).has_aggregation());
    assert!(!(col("x") + lit(1i64)).has_aggregation());
}
