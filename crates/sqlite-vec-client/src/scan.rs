use std::collections::VecDeque;

use crate::client::VecClient;
use crate::error::Result;
use crate::types::{Record, Rowid};

/// Keyset-paginated iterator returned by [`VecClient::get_all`].
///
/// Each refill asks for rows with `rowid` greater than the last one seen, so
/// pages never overlap even if earlier rows are deleted mid-scan. The first
/// error ends the iteration.
#[derive(Debug)]
pub struct RecordIter<'a> {
    client: &'a VecClient,
    batch_size: usize,
    last_rowid: Rowid,
    buffer: VecDeque<Record>,
    done: bool,
}

impl<'a> RecordIter<'a> {
    pub(crate) fn new(client: &'a VecClient, batch_size: usize) -> Self {
        Self {
            client,
            batch_size,
            last_rowid: 0,
            buffer: VecDeque::new(),
            done: false,
        }
    }
}

impl Iterator for RecordIter<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(record) = self.buffer.pop_front() {
            return Some(Ok(record));
        }
        if self.done {
            return None;
        }
        match self.client.fetch_page(self.last_rowid, self.batch_size) {
            Ok(page) => {
                let Some(last) = page.last() else {
                    self.done = true;
                    return None;
                };
                self.last_rowid = last.rowid;
                self.buffer.extend(page);
                self.buffer.pop_front().map(Ok)
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
