use crate::{
    Batch,
    CollectError,
};
use std::{
    future::Future,
    pin::Pin,
};

/// Trait for adding one group of series to a batch
pub trait Collector: Send + Sync {
    /// Collect into `batch`, returning the number of series added
    fn collect<'a>(&'a self, batch: &'a mut Batch) -> Pin<Box<dyn Future<Output = Result<usize, CollectError>> + Send + 'a>>;

    /// Get the name of this collector
    fn name(&self) -> &'static str;
}
