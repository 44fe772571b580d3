use galleon::dataframe::join::JoinType;
use galleon::dataframe::DataFrame;
use galleon::series::Series;
use galleon::GalleonError;

fn left() -> DataFrame {
    DataFrame::new(vec![
        Series::new_i64("k", vec![1, 2, 3]),
        Series::new_i64("a", vec![10, 20, 30]),
    ])
    .unwrap()
}

fn right() -> DataFrame {
    DataFrame::new(vec![
        Series::new_i64("k", vec![2, 3, 4]),
        Series::new_f64("b", vec![200.0, 300.0, 400.0]),
    ])
    .unwrap()
}

#[test]
fn test_inner_join_scenario() {
    let out = left().join(&right(), &["k"], JoinType::Inner).unwrap();
    assert_eq!(out.column_names(), vec!["k", "a", "b"]);
    assert_eq!(out.column_by_name("k").unwrap().i64().unwrap(), &[2, 3]);
    assert_eq!(out.column_by_name("a").unwrap().i64().unwrap(), &[20, 30]);
    assert_eq!(out.column_by_name("b").unwrap().f64().unwrap(), &[200.0, 300.0]);
}

#[test]
fn test_left_join_scenario() {
    let out = left().join(&right(), &["k"], JoinType::Left).unwrap();
    assert_eq!(out.column_by_name("k").unwrap().i64().unwrap(), &[1, 2, 3]);
    assert_eq!(out.column_by_name("a").unwrap().i64().unwrap(), &[10, 20, 30]);
    let b = out.column_by_name("b").unwrap().f64().unwrap();
    assert!(b[0].is_nan());
    assert_eq!(&b[1..], &[200.0, 300.0]);
}

#[test]
fn test_lazy_join() {
    let out = left()
        .lazy()
        .join(right().lazy(), vec!["k"], JoinType::Inner)
        .collect()
        .unwrap();
    assert_eq!(out.column_by_name("k").unwrap().i64().unwrap(), &[2, 3]);
}

#[test]
fn test_inner_join_commutative_cardinality() {
    // Duplicate keys: cardinality is the sum over keys of |L_k| * |R_k|.
    let l = DataFrame::new(vec![
        Series::new_i64("k", vec![1, 1, 2, 3]),
        Series::new_i64("a", vec![1, 2, 3, 4]),
    ])
    .unwrap();
    let r = DataFrame::new(vec![
        Series::new_i64("k", vec![1, 1, 1, 2]),
        Series::new_i64("b", vec![5, 6, 7, 8]),
    ])
    .unwrap();
    let lr = l.join(&r, &["k"], JoinType::Inner).unwrap();
    let rl = r.join(&l, &["k"], JoinType::Inner).unwrap();
    // key 1: 2 * 3 = 6, key 2: 1 * 1 = 1, key 3: unmatched.
    assert_eq!(lr.height(), 7);
    assert_eq!(rl.height(), 7);

    let mut a: Vec<i64> = lr.column_by_name("k").unwrap().i64().unwrap().to_vec();
    let mut b: Vec<i64> = rl.column_by_name("k").unwrap().i64().unwrap().to_vec();
    a.sort_unstable();
    b.sort_unstable();
    assert_eq!(a, b);
}

#[test]
fn test_absent_build_key() {
    let l = DataFrame::new(vec![
        Series::new_i64("k", vec![9]),
        Series::new_i64("a", vec![1]),
    ])
    .unwrap();
    let inner = l.join(&right(), &["k"], JoinType::Inner).unwrap();
    assert_eq!(inner.height(), 0);

    let left_join = l.join(&right(), &["k"], JoinType::Left).unwrap();
    assert_eq!(left_join.height(), 1);
    assert!(left_join.column_by_name("b").unwrap().f64().unwrap()[0].is_nan());
}

#[test]
fn test_right_and_outer() {
    let out = left().join(&right(), &["k"], JoinType::Right).unwrap();
    assert_eq!(out.column_by_name("k").unwrap().i64().unwrap(), &[2, 3, 4]);
    assert_eq!(out.column_by_name("a").unwrap().i64().unwrap(), &[20, 30, 0]);

    let out = left().join(&right(), &["k"], JoinType::Outer).unwrap();
    assert_eq!(out.height(), 4);
    assert_eq!(out.column_by_name("k").unwrap().i64().unwrap(), &[2, 3, 1, 4]);
    let b = out.column_by_name("b").unwrap().f64().unwrap();
    assert_eq!(&b[..2], &[200.0, 300.0]);
    assert!(b[2].is_nan());
    assert_eq!(b[3], 400.0);
}

#[test]
fn test_multi_key_join() {
    let l = DataFrame::new(vec![
        Series::new_i64("k1", vec![1, 1, 2]),
        Series::new_string(
            "k2",
            ["x", "y", "x"].iter().map(|s| s.to_string()).collect(),
        ),
        Series::new_i64("a", vec![10, 20, 30]),
    ])
    .unwrap();
    let r = DataFrame::new(vec![
        Series::new_i64("k1", vec![1, 2, 2]),
        Series::new_string(
            "k2",
            ["y", "x", "z"].iter().map(|s| s.to_string()).collect(),
        ),
        Series::new_i64("b", vec![100, 200, 300]),
    ])
    .unwrap();
    let out = l.join(&r, &["k1", "k2"], JoinType::Inner).unwrap();
    assert_eq!(out.height(), 2);
    assert_eq!(out.column_by_name("a").unwrap().i64().unwrap(), &[20, 30]);
    assert_eq!(out.column_by_name("b").unwrap().i64().unwrap(), &[100, 200]);
}

#[test]
fn test_string_keys() {
    let l = DataFrame::new(vec![
        Series::new_string(
            "k",
            ["ann", "bob"].iter().map(|s| s.to_string()).collect(),
        ),
        Series::new_i64("a", vec![1, 2]),
    ])
    .unwrap();
    let r = DataFrame::new(vec![
        Series::new_string(
            "k",
            ["bob", "cat"].iter().map(|s| s.to_string()).collect(),
        ),
        Series::new_i64("b", vec![3, 4]),
    ])
    .unwrap();
    let out = l.join(&r, &["k"], JoinType::Outer).unwrap();
    assert_eq!(out.height(), 3);
    assert_eq!(
        out.column_by_name("k").unwrap().str().unwrap(),
        &["bob".to_string(), "ann".to_string(), "cat".to_string()]
    );
    // Unmatched string payloads fill with the empty string.
    assert_eq!(
        out.column_by_name("a").unwrap().i64().unwrap(),
        &[2, 1, 0]
    );
}

#[test]
fn test_key_dtype_mismatch() {
    let l = DataFrame::new(vec![Series::new_i64("k", vec![1])]).unwrap();
    let r = DataFrame::new(vec![
        Series::new_f64("k", vec![1.0]),
        Series::new_i64("b", vec![2]),
    ])
    .unwrap();
    assert!(matches!(
        l.join(&r, &["k"], JoinType::Inner).unwrap_err(),
        GalleonError::DTypeMismatch(_)
    ));
}

#[test]
fn test_missing_key_column() {
    let l = DataFrame::new(vec![Series::new_i64("k", vec![1])]).unwrap();
    let r = DataFrame::new(vec![Series::new_i64("other", vec![1])]).unwrap();
    assert!(matches!(
        l.join(&r, &["k"], JoinType::Inner).unwrap_err(),
        GalleonError::ColumnNotFound(_)
    ));
}
