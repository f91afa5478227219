//! Pagination window re-application.

use crate::datum::Datum;
use crate::rewrite::PaginationWindow;

use super::{Error, MergedResult};

/// Re-applies the true LIMIT window over a merged stream: every
/// shard over-fetched `offset + row_count` rows, so the real offset
/// is skipped here and the emitted row count capped.
pub struct LimitDecorator {
    inner: Box<dyn MergedResult>,
    window: PaginationWindow,
    skipped: bool,
    emitted: u64,
    exhausted: bool,
}

impl LimitDecorator {
    pub fn new(inner: Box<dyn MergedResult>, window: PaginationWindow) -> Self {
        Self {
            inner,
            window,
            skipped: false,
            emitted: 0,
            exhausted: false,
        }
    }
}

impl MergedResult for LimitDecorator {
    fn next(&mut self) -> Result<bool, Error> {
        if self.exhausted {
            return Ok(false);
        }

        if !self.skipped {
            for _ in 0..self.window.offset {
                if !self.inner.next()? {
                    self.exhausted = true;
                    return Ok(false);
                }
            }
            self.skipped = true;
        }

        if let Some(row_count) = self.window.row_count {
            if self.emitted >= row_count {
                self.exhausted = true;
                return Ok(false);
            }
        }

        if self.inner.next()? {
            self.emitted += 1;
            Ok(true)
        } else {
            self.exhausted = true;
            Ok(false)
        }
    }

    fn value(&mut self, column: usize) -> Result<Datum, Error> {
        self.inner.value(column)
    }

    fn was_null(&self) -> bool {
        self.inner.was_null()
    }
}
