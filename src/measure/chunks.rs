/// A contiguous block of identifiers handed out by one insert batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    pub first: i64,
    pub count: usize,
}

impl IdRange {
    pub fn new(first: i64, count: usize) -> Self {
        Self { first, count }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn last(&self) -> Option<i64> {
        (!self.is_empty()).then(|| self.first + self.count as i64 - 1)
    }

    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        (0..self.count as i64).map(move |offset| self.first + offset)
    }

    /// Splits the range into consecutive chunks of at most `size` ids. The last
    /// chunk holds the remainder.
    pub fn chunks(&self, size: usize) -> Vec<Vec<i64>> {
        let size = size.max(1);
        let ids: Vec<i64> = self.ids().collect();
        ids.chunks(size).map(<[i64]>::to_vec).collect()
    }
}
