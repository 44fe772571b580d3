use galleon::dataframe::DataFrame;
use galleon::expressions::{col, lit};
use galleon::performance::parallel::CancelToken;
use galleon::pipeline::{BatchReader, Pipeline, SliceReader};
use galleon::schema::Schema;
use galleon::series::Series;
use galleon::GalleonError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Wraps a reader and counts `close` calls, so tests can assert the
/// pipeline closes exactly once.
struct CountingReader {
    inner: SliceReader,
    closes: Arc<AtomicUsize>,
}

impl BatchReader for CountingReader {
    fn next_batch(&mut self, token: &CancelToken) -> Result<Option<DataFrame>, GalleonError> {
        self.inner.next_batch(token)
    }

    fn schema(&self) -> Option<Schema> {
        self.inner.schema()
    }

    fn close(&mut self) -> Result<(), GalleonError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close()
    }
}

fn two_batches() -> Vec<DataFrame> {
    vec![
        DataFrame::new(vec![Series::new_i64("v", vec![1, 2, 3, 4])]).unwrap(),
        DataFrame::new(vec![Series::new_i64("v", vec![5, 6, 7, 8])]).unwrap(),
    ]
}

#[test]
fn test_filter_limit_collect_scenario() {
    // Two batches of four rows, filter v > 3, limit 3.
    let closes = Arc::new(AtomicUsize::new(0));
    let reader = CountingReader {
        inner: SliceReader::new(two_batches()),
        closes: Arc::clone(&closes),
    };
    let out = Pipeline::new(Box::new(reader))
        .filter(col("v").gt(lit(3i64)))
        .limit(3)
        .collect(&CancelToken::new())
        .unwrap();
    assert_eq!(out.column_by_name("v").unwrap().i64().unwrap(), &[4, 5, 6]);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_for_each_visits_batches_in_order() {
    let mut seen: Vec<i64> = Vec::new();
    Pipeline::new(Box::new(SliceReader::new(two_batches())))
        .for_each(&CancelToken::new(), |batch| {
            seen.extend(batch.column_by_name("v")?.i64()?);
            Ok(())
        })
        .unwrap();
    assert_eq!(seen, vec![1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn test_chained_filters_then_transform() {
    let out = Pipeline::new(Box::new(SliceReader::new(two_batches())))
        .filter(col("v").gt(lit(2i64)))
        .filter(col("v").lt(lit(7i64)))
        .transform(|batch| {
            let bumped = batch.column_by_name("v")?.add_scalar(&100i64.into())?;
            DataFrame::new(vec![bumped])
        })
        .collect(&CancelToken::new())
        .unwrap();
    assert_eq!(
        out.column_by_name("v").unwrap().i64().unwrap(),
        &[103, 104, 105, 106]
    );
}

#[test]
fn test_empty_result_has_reader_schema() {
    let out = Pipeline::new(Box::new(SliceReader::new(two_batches())))
        .filter(col("v").gt(lit(1000i64)))
        .collect(&CancelToken::new())
        .unwrap();
    assert_eq!(out.height(), 0);
    assert_eq!(out.column_names(), vec!["v"]);
}

#[test]
fn test_reader_with_no_batches() {
    let out = Pipeline::new(Box::new(SliceReader::new(Vec::new())))
        .collect(&CancelToken::new())
        .unwrap();
    assert_eq!(out.height(), 0);
    assert_eq!(out.width(), 0);
}

#[test]
fn test_limit_zero() {
    let out = Pipeline::new(Box::new(SliceReader::new(two_batches())))
        .limit(0)
        .collect(&CancelToken::new())
        .unwrap();
    assert_eq!(out.height(), 0);
}

#[test]
fn test_cancellation_closes_reader() {
    let closes = Arc::new(AtomicUsize::new(0));
    let reader = CountingReader {
        inner: SliceReader::new(two_batches()),
        closes: Arc::clone(&closes),
    };
    let token = CancelToken::new();
    token.cancel();
    let err = Pipeline::new(Box::new(reader))
        .collect(&token)
        .unwrap_err();
    assert_eq!(err, GalleonError::Cancelled);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_transform_error_propagates_and_closes() {
    let closes = Arc::new(AtomicUsize::new(0));
    let reader = CountingReader {
        inner: SliceReader::new(two_batches()),
        closes: Arc::clone(&closes),
    };
    let err = Pipeline::new(Box::new(reader))
        .transform(|_| Err(GalleonError::ReaderError("bad batch".to_string())))
        .collect(&CancelToken::new())
        .unwrap_err();
    assert_eq!(err, GalleonError::ReaderError("bad batch".to_string()));
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}
