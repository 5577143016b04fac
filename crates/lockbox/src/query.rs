//! Lazy, paginated record queries.
//!
//! A [`Query`] collects filters; [`Query::iter`] turns it into a
//! [`QueryIter`] without touching the network. Pages are fetched as the
//! iterator is advanced, and each record is decrypted when it is yielded.
//!
//! ```rust,no_run
//! # async fn example(client: &lockbox::Client<lockbox::MemoryConnection>) -> lockbox::Result<()> {
//! let mut results = client.query().include_data(true).record_type("contact").iter();
//! while let Some(record) = results.next().await {
//!     let record = record?;
//!     println!("{:?}", record.data());
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use lockbox_core::{ClientId, Record, RecordId, RecordType};
use lockbox_store::{Connection, Cursor, QueryFilter};

use crate::error::{ClientError, Result};
use crate::keyring::Keyring;

/// Builder for a record query.
pub struct Query<C> {
    keyring: Arc<Keyring<C>>,
    filter: QueryFilter,
    after: Option<Cursor>,
    invalid_type: Option<ClientError>,
}

impl<C: Connection> Query<C> {
    pub(crate) fn new(keyring: Arc<Keyring<C>>, page_size: usize) -> Self {
        Self {
            keyring,
            filter: QueryFilter {
                page_size: page_size.max(1),
                ..QueryFilter::default()
            },
            after: None,
            invalid_type: None,
        }
    }

    /// Decrypt and return record data, not just metadata.
    pub fn include_data(mut self, include: bool) -> Self {
        self.filter.include_data = include;
        self
    }

    /// Also return records from other writers that shared with us.
    pub fn include_all_writers(mut self, include: bool) -> Self {
        self.filter.include_all_writers = include;
        self
    }

    /// Restrict to a writer. May be called repeatedly.
    pub fn writer(mut self, writer_id: ClientId) -> Self {
        self.filter.writer_ids.push(writer_id);
        self
    }

    /// Restrict to a record id. May be called repeatedly.
    pub fn record_id(mut self, record_id: RecordId) -> Self {
        self.filter.record_ids.push(record_id);
        self
    }

    /// Restrict to a record type. May be called repeatedly.
    ///
    /// An invalid type name is reported by the first call to
    /// [`QueryIter::next`].
    pub fn record_type(mut self, record_type: &str) -> Self {
        match RecordType::new(record_type) {
            Ok(ty) => self.filter.record_types.push(ty),
            Err(e) => {
                self.invalid_type.get_or_insert(e.into());
            }
        }
        self
    }

    /// Records per page, overriding the client default.
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.filter.page_size = page_size.max(1);
        self
    }

    /// Start after a cursor from an earlier iterator.
    pub fn after(mut self, cursor: Cursor) -> Self {
        self.after = Some(cursor);
        self
    }

    /// The filter this query will send.
    pub fn filter(&self) -> &QueryFilter {
        &self.filter
    }

    /// Turn the query into a lazy iterator. Performs no I/O.
    pub fn iter(self) -> QueryIter<C> {
        QueryIter {
            keyring: self.keyring,
            filter: self.filter,
            cursor: self.after,
            buffer: VecDeque::new(),
            pending_error: self.invalid_type,
            done: false,
        }
    }
}

/// A single-pass, lazily paged sequence of records.
///
/// A page-fetch error is yielded once and ends the iteration. A record that
/// fails to decrypt is yielded as an error and iteration moves on to the
/// next record. Dropping the iterator early has no side effects.
pub struct QueryIter<C> {
    keyring: Arc<Keyring<C>>,
    filter: QueryFilter,
    cursor: Option<Cursor>,
    buffer: VecDeque<Record>,
    pending_error: Option<ClientError>,
    done: bool,
}

impl<C: Connection> QueryIter<C> {
    /// Advance to the next record, fetching a page if needed.
    pub async fn next(&mut self) -> Option<Result<Record>> {
        if let Some(e) = self.pending_error.take() {
            self.done = true;
            self.buffer.clear();
            return Some(Err(e));
        }

        loop {
            if let Some(record) = self.buffer.pop_front() {
                if !self.filter.include_data {
                    return Some(Ok(record));
                }
                return Some(self.keyring.decrypt(record).await);
            }

            if self.done {
                return None;
            }

            match self.keyring.connection.query(&self.filter, self.cursor).await {
                Ok(page) => {
                    match page.next {
                        Some(next) if !page.records.is_empty() => self.cursor = Some(next),
                        _ => self.done = true,
                    }
                    self.buffer.extend(page.records);
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
        }
    }

    /// Cursor after the last record fetched so far.
    ///
    /// A fresh query started [`after`](Query::after) this cursor continues
    /// with the records following it, including ones written later.
    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    /// Drain the remaining records, failing on the first error.
    pub async fn collect_records(mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(record) = self.next().await {
            records.push(record?);
        }
        Ok(records)
    }
}
