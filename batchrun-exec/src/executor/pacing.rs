use std::ops::Range;

/// Partition of `len` items into consecutive batches of at most `batch_size`.
///
/// Batches only decide where the longer inter-batch pause goes; items are always
/// processed one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    len: usize,
    batch_size: usize,
}

impl BatchPlan {
    /// A zero batch size is treated as one.
    pub fn new(len: usize, batch_size: usize) -> Self {
        Self {
            len,
            batch_size: batch_size.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_batches(&self) -> usize {
        self.len.div_ceil(self.batch_size)
    }

    pub fn batch(&self, index: usize) -> Range<usize> {
        let start = (index * self.batch_size).min(self.len);
        let end = (start + self.batch_size).min(self.len);
        start..end
    }

    pub fn batches(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.total_batches()).map(move |b| self.batch(b))
    }

    pub fn is_last_item(&self, index: usize) -> bool {
        index + 1 >= self.len
    }

    pub fn is_last_batch(&self, index: usize) -> bool {
        index + 1 >= self.total_batches()
    }
}
