//! Streaming batch pipeline.
//!
//! A [`Pipeline`] wraps a [`BatchReader`] and applies accumulated filters,
//! then transforms, to every batch. A row limit truncates the batch that
//! crosses it and stops the read loop. Cancellation is observed at batch
//! boundaries. The reader is closed exactly once on every exit path.

use crate::dataframe::DataFrame;
use crate::expressions::Expr;
use crate::lazy::executor::filter_dataframe;
use crate::lazy::ExecOptions;
use crate::performance::parallel::CancelToken;
use crate::schema::Schema;
use crate::GalleonError;
use log::debug;

/// Source of frame batches.
///
/// Contract: `next_batch` yields `Ok(Some(frame))` until the input is
/// exhausted, then `Ok(None)`; after `None` or an error, later calls must
/// keep returning the same terminal signal. When `schema` returns a value,
/// every yielded frame conforms to it. `close` is idempotent.
pub trait BatchReader {
    fn next_batch(&mut self, token: &CancelToken) -> Result<Option<DataFrame>, GalleonError>;

    fn schema(&self) -> Option<Schema>;

    fn close(&mut self) -> Result<(), GalleonError>;
}

/// A per-batch transformation applied after the filters.
pub type BatchTransform = Box<dyn FnMut(DataFrame) -> Result<DataFrame, GalleonError>>;

/// Streaming pipeline over a [`BatchReader`].
///
/// # Examples
///
/// ```rust
/// use galleon::expressions::{col, lit};
/// use galleon::performance::parallel::CancelToken;
/// use galleon::pipeline::{Pipeline, SliceReader};
///
/// let reader = SliceReader::new(vec![/* batches */]);
/// let out = Pipeline::new(Box::new(reader))
///     .filter(col("v").gt(lit(3i64)))
///     .limit(3)
///     .collect(&CancelToken::new());
/// ```
pub struct Pipeline {
    reader: Box<dyn BatchReader>,
    filters: Vec<Expr>,
    transforms: Vec<BatchTransform>,
    limit: Option<usize>,
}

impl Pipeline {
    pub fn new(reader: Box<dyn BatchReader>) -> Self {
        Pipeline {
            reader,
            filters: Vec::new(),
            transforms: Vec::new(),
            limit: None,
        }
    }

    /// Adds a row filter; filters run in insertion order, before transforms.
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.filters.push(predicate);
        self
    }

    /// Adds a per-batch transform; transforms run in insertion order, after
    /// the filters.
    pub fn transform(
        mut self,
        f: impl FnMut(DataFrame) -> Result<DataFrame, GalleonError> + 'static,
    ) -> Self {
        self.transforms.push(Box::new(f));
        self
    }

    /// Caps the total number of rows produced.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Runs the pipeline, invoking `f` for every produced batch.
    pub fn for_each(
        mut self,
        token: &CancelToken,
        mut f: impl FnMut(&DataFrame) -> Result<(), GalleonError>,
    ) -> Result<(), GalleonError> {
        let result = self.run(token, &mut f);
        let close_result = self.reader.close();
        result?;
        close_result
    }

    /// Runs the pipeline and concatenates every produced batch. With no
    /// input rows the result is an empty frame with the reader's schema.
    pub fn collect(self, token: &CancelToken) -> Result<DataFrame, GalleonError> {
        let schema = self.reader.schema();
        let mut batches: Vec<DataFrame> = Vec::new();
        self.for_each(token, |batch| {
            batches.push(batch.clone());
            Ok(())
        })?;
        let mut iter = batches.into_iter();
        match iter.next() {
            Some(first) => iter.try_fold(first, |acc, batch| acc.concat(&batch)),
            None => match schema {
                Some(schema) => DataFrame::empty_from_schema(&schema),
                None => Ok(DataFrame::empty()),
            },
        }
    }

    fn run(
        &mut self,
        token: &CancelToken,
        emit: &mut dyn FnMut(&DataFrame) -> Result<(), GalleonError>,
    ) -> Result<(), GalleonError> {
        let exec = ExecOptions {
            token: token.clone(),
            ..Default::default()
        };
        let mut produced = 0usize;
        let mut batch_index = 0usize;
        loop {
            token.check()?;
            let Some(mut batch) = self.reader.next_batch(token)? else {
                return Ok(());
            };
            batch_index += 1;
            for predicate in &self.filters {
                batch = filter_dataframe(&batch, predicate, &exec)?;
            }
            for transform in self.transforms.iter_mut() {
                batch = transform(batch)?;
            }
            if let Some(limit) = self.limit {
                let remaining = limit - produced;
                if batch.height() >= remaining {
                    let batch = batch.head(remaining);
                    debug!(
                        "pipeline batch {}: {} rows (limit reached)",
                        batch_index,
                        batch.height()
                    );
                    if batch.height() > 0 {
                        emit(&batch)?;
                    }
                    return Ok(());
                }
            }
            produced += batch.height();
            debug!("pipeline batch {}: {} rows", batch_index, batch.height());
            if batch.height() > 0 {
                emit(&batch)?;
            }
        }
    }
}

/// A [`BatchReader`] over an in-memory list of frames. Useful for tests and
/// as the adapter template for external readers.
pub struct SliceReader {
    batches: std::vec::IntoIter<DataFrame>,
    schema: Option<Schema>,
    closed: bool,
    close_count: usize,
}

impl SliceReader {
    pub fn new(batches: Vec<DataFrame>) -> Self {
        let schema = batches.first().map(|b| b.schema());
        SliceReader {
            batches: batches.into_iter(),
            schema,
            closed: false,
            close_count: 0,
        }
    }

    /// How many times `close` has been called.
    pub fn close_count(&self) -> usize {
        self.close_count
    }
}

impl BatchReader for SliceReader {
    fn next_batch(&mut self, token: &CancelToken) -> Result<Option<DataFrame>, GalleonError> {
        token.check()?;
        if self.closed {
            return Ok(None);
        }
        Ok(self.batches.next())
    }

    fn schema(&self) -> Option<Schema> {
        self.schema.clone()
    }

    fn close(&mut self) -> Result<(), GalleonError> {
        self.closed = true;
        self.close_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expressions::{col, lit};
    use crate::series::Series;

    fn batches() -> Vec<DataFrame> {
        vec![
            DataFrame::new(vec![Series::new_i64("v", vec![1, 2, 3, 4])]).unwrap(),
            DataFrame::new(vec![Series::new_i64("v", vec![5, 6, 7, 8])]).unwrap(),
        ]
    }

    #[test]
    fn test_filter_and_limit() {
        let out = Pipeline::new(Box::new(SliceReader::new(batches())))
            .filter(col("v").gt(lit(3i64)))
            .limit(3)
            .collect(&CancelToken::new())
            .unwrap();
        assert_eq!(out.column_by_name("v").unwrap().i64().unwrap(), &[4, 5, 6]);
    }

    #[test]
    fn test_transforms_run_after_filters() {
        let out = Pipeline::new(Box::new(SliceReader::new(batches())))
            .filter(col("v").lt_eq(lit(2i64)))
            .transform(|batch| {
                let doubled = batch.column_by_name("v")?.mul_scalar(&2i64.into())?;
                DataFrame::new(vec![doubled])
            })
            .collect(&CancelToken::new())
            .unwrap();
        assert_eq!(out.column_by_name("v").unwrap().i64().unwrap(), &[2, 4]);
    }

    #[test]
    fn test_empty_input_keeps_schema() {
        let empty_batches =
            vec![DataFrame::new(vec![Series::new_i64("v", vec![1, 2])]).unwrap()];
        let out = Pipeline::new(Box::new(SliceReader::new(empty_batches)))
            .filter(col("v").gt(lit(100i64)))
            .collect(&CancelToken::new())
            .unwrap();
        assert_eq!(out.height(), 0);
        assert_eq!(out.column_names(), vec!["v"]);
    }

    #[test]
    fn test_cancellation_surfaces() {
        let token = CancelToken::new();
        token.cancel();
        let err = Pipeline::new(Box::new(SliceReader::new(batches())))
            .collect(&token)
            .unwrap_err();
        assert_eq!(err, GalleonError::Cancelled);
    }
}
