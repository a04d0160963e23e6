//! Rid-order iteration over heap files.
//!
//! [`RecordScan`] walks every occupied slot of a heap file in
//! (page ascending, slot ascending) order, consulting each page's
//! occupancy bitmap and skipping pages with no records at all.
//! [`RowCursor`] is the shared cursor capability; index range scans
//! implement the same contract over their own storage.

use super::bitmap;
use super::error::HeapError;
use super::file::{FileHeader, Rid, TableFile};

/// A cursor over physical rids.
///
/// Implemented by [`RecordScan`] for heap files and by index cursors
/// for ordered key ranges; scan operators drive either through this
/// one interface.
pub trait RowCursor {
    /// Error type surfaced while advancing.
    type Error;

    /// Advances to the next rid. A cursor already at the end stays
    /// there.
    fn next(&mut self) -> Result<(), Self::Error>;

    /// Returns the rid at the current position.
    fn rid(&self) -> Rid;

    /// Returns true once the cursor is exhausted.
    fn is_end(&self) -> bool;
}

/// Linear iterator over all occupied slots of a heap file.
///
/// The header is snapshotted at construction; records inserted behind
/// the cursor during iteration are not revisited.
pub struct RecordScan<'a, F: TableFile> {
    file: &'a F,
    header: FileHeader,
    rid: Rid,
}

impl<'a, F: TableFile> RecordScan<'a, F> {
    /// Creates a scan positioned at the first occupied slot, or at the
    /// end for a file with no records.
    pub fn new(file: &'a F) -> Result<Self, HeapError> {
        let header = file.header();
        let mut scan = Self {
            file,
            header,
            rid: Rid::INVALID,
        };
        scan.seek_from(1)?;
        Ok(scan)
    }

    /// Positions at the first occupied slot on or after `page`, or at
    /// the end sentinel when no page has one.
    fn seek_from(&mut self, mut page: u32) -> Result<(), HeapError> {
        let per_page = self.header.num_records_per_page;
        while page < self.header.num_pages {
            let map = self.file.bitmap(page)?;
            if let Some(slot) = bitmap::first_set(&map, per_page) {
                self.rid = Rid::new(page, slot as i32);
                return Ok(());
            }
            page += 1;
        }
        // End sentinel: one past the last page, slot at capacity.
        self.rid = Rid::new(self.header.num_pages, per_page as i32);
        Ok(())
    }
}

impl<F: TableFile> RowCursor for RecordScan<'_, F> {
    type Error = HeapError;

    fn next(&mut self) -> Result<(), HeapError> {
        if self.is_end() {
            return Ok(());
        }
        let per_page = self.header.num_records_per_page;
        let map = self.file.bitmap(self.rid.page_no)?;
        match bitmap::next_set(&map, per_page, self.rid.slot_no as usize) {
            Some(slot) => {
                self.rid.slot_no = slot as i32;
                Ok(())
            }
            None => self.seek_from(self.rid.page_no + 1),
        }
    }

    fn rid(&self) -> Rid {
        self.rid
    }

    fn is_end(&self) -> bool {
        self.rid.page_no >= self.header.num_pages
            && self.rid.slot_no as usize == self.header.num_records_per_page
    }
}
