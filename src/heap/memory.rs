//! In-memory heap file implementation.
//!
//! [`MemoryTable`] keeps its pages in a `Vec` behind a `parking_lot`
//! read-write lock. It is the storage used by the unit and integration
//! tests and by small embedded deployments; a buffer-pool-backed file
//! implements the same [`TableFile`] contract.

use parking_lot::RwLock;

use crate::tx::Context;

use super::bitmap;
use super::error::HeapError;
use super::file::{FileHeader, Record, Rid, TableFile};

/// Byte size used to derive the default slot capacity of a page.
const PAGE_SIZE: usize = 4096;
/// Bytes reserved per page for bookkeeping when deriving capacity.
const PAGE_HEADER_SIZE: usize = 24;

/// One data page: a slot occupancy bitmap plus the slot payload bytes.
struct HeapPage {
    map: Vec<u8>,
    data: Vec<u8>,
}

impl HeapPage {
    fn new(record_size: usize, records_per_page: usize) -> Self {
        Self {
            map: vec![0u8; records_per_page.div_ceil(8)],
            data: vec![0u8; record_size * records_per_page],
        }
    }
}

/// An in-memory heap file of fixed-width records.
///
/// Page 0 is the reserved header page; data pages are appended as
/// inserts outgrow the existing slots and are never reclaimed. Freed
/// slots are reused first-fit, lowest page then lowest slot.
///
/// Row and table locks are routed through the operation [`Context`]:
/// reads take IS on the table and S on the record, mutations take IX
/// and X. A recovery context (no lock manager) bypasses locking.
pub struct MemoryTable {
    table_id: u32,
    record_size: usize,
    records_per_page: usize,
    pages: RwLock<Vec<HeapPage>>,
}

impl MemoryTable {
    /// Creates an empty table with a page capacity derived from a
    /// 4 KiB page budget.
    pub fn new(table_id: u32, record_size: usize) -> Self {
        let records_per_page = ((PAGE_SIZE - PAGE_HEADER_SIZE) * 8 / (record_size * 8 + 1)).max(1);
        Self::with_records_per_page(table_id, record_size, records_per_page)
    }

    /// Creates an empty table with an explicit per-page slot capacity.
    ///
    /// Small capacities force multi-page files with few records, which
    /// the scan tests rely on.
    pub fn with_records_per_page(
        table_id: u32,
        record_size: usize,
        records_per_page: usize,
    ) -> Self {
        Self {
            table_id,
            record_size,
            records_per_page,
            pages: RwLock::new(Vec::new()),
        }
    }

    /// Takes IS on the table and S on the record when the context
    /// carries a lock manager.
    fn lock_for_read(&self, rid: Rid, ctx: &Context<'_>) -> Result<(), HeapError> {
        if let Some(locks) = ctx.locks {
            locks.lock_is_on_table(ctx.txn, self.table_id)?;
            locks.lock_shared_on_record(ctx.txn, rid, self.table_id)?;
        }
        Ok(())
    }

    /// Takes IX on the table and X on the record when the context
    /// carries a lock manager.
    fn lock_for_write(&self, rid: Rid, ctx: &Context<'_>) -> Result<(), HeapError> {
        if let Some(locks) = ctx.locks {
            locks.lock_ix_on_table(ctx.txn, self.table_id)?;
            locks.lock_exclusive_on_record(ctx.txn, rid, self.table_id)?;
        }
        Ok(())
    }

    /// Maps a rid to its index in the page vector (external page
    /// numbers are 1-based, page 0 being the header), verifying the
    /// slot is occupied.
    fn check_occupied(&self, pages: &[HeapPage], rid: Rid) -> Result<usize, HeapError> {
        if rid.page_no == 0 || rid.page_no as usize > pages.len() {
            return Err(HeapError::RecordNotFound(rid));
        }
        let idx = rid.page_no as usize - 1;
        if rid.slot_no < 0 || rid.slot_no as usize >= self.records_per_page {
            return Err(HeapError::RecordNotFound(rid));
        }
        if !bitmap::test(&pages[idx].map, rid.slot_no as usize) {
            return Err(HeapError::RecordNotFound(rid));
        }
        Ok(idx)
    }

    fn check_size(&self, data: &[u8]) -> Result<(), HeapError> {
        if data.len() != self.record_size {
            return Err(HeapError::RecordSizeMismatch {
                expected: self.record_size,
                actual: data.len(),
            });
        }
        Ok(())
    }
}

impl TableFile for MemoryTable {
    fn table_id(&self) -> u32 {
        self.table_id
    }

    fn header(&self) -> FileHeader {
        FileHeader {
            record_size: self.record_size,
            num_pages: self.pages.read().len() as u32 + 1,
            num_records_per_page: self.records_per_page,
        }
    }

    fn bitmap(&self, page_no: u32) -> Result<Vec<u8>, HeapError> {
        let pages = self.pages.read();
        if page_no == 0 || page_no as usize > pages.len() {
            return Err(HeapError::PageOutOfRange {
                page_no,
                num_pages: pages.len() as u32 + 1,
            });
        }
        Ok(pages[page_no as usize - 1].map.clone())
    }

    fn get_record(&self, rid: Rid, ctx: &Context<'_>) -> Result<Record, HeapError> {
        self.lock_for_read(rid, ctx)?;
        let pages = self.pages.read();
        let page_no = self.check_occupied(&pages, rid)?;
        let start = rid.slot_no as usize * self.record_size;
        Ok(Record::from_bytes(
            &pages[page_no].data[start..start + self.record_size],
        ))
    }

    fn insert_record(&self, data: &[u8], ctx: &Context<'_>) -> Result<Rid, HeapError> {
        self.check_size(data)?;
        let mut pages = self.pages.write();

        // First-fit: lowest page with a free slot, else append a page.
        let (page_idx, slot) = match pages
            .iter()
            .enumerate()
            .find_map(|(i, p)| bitmap::first_clear(&p.map, self.records_per_page).map(|s| (i, s)))
        {
            Some(found) => found,
            None => {
                pages.push(HeapPage::new(self.record_size, self.records_per_page));
                (pages.len() - 1, 0)
            }
        };
        let rid = Rid::new(page_idx as u32 + 1, slot as i32);

        // Lock before mutating so a no-wait refusal leaves the page
        // untouched.
        self.lock_for_write(rid, ctx)?;

        let page = &mut pages[page_idx];
        bitmap::set(&mut page.map, slot);
        let start = slot * self.record_size;
        page.data[start..start + self.record_size].copy_from_slice(data);
        Ok(rid)
    }

    fn delete_record(&self, rid: Rid, ctx: &Context<'_>) -> Result<(), HeapError> {
        self.lock_for_write(rid, ctx)?;
        let mut pages = self.pages.write();
        let page_no = self.check_occupied(&pages, rid)?;
        let page = &mut pages[page_no];
        bitmap::clear(&mut page.map, rid.slot_no as usize);
        let start = rid.slot_no as usize * self.record_size;
        page.data[start..start + self.record_size].fill(0);
        Ok(())
    }

    fn update_record(&self, rid: Rid, data: &[u8], ctx: &Context<'_>) -> Result<(), HeapError> {
        self.check_size(data)?;
        self.lock_for_write(rid, ctx)?;
        let mut pages = self.pages.write();
        let page_no = self.check_occupied(&pages, rid)?;
        let start = rid.slot_no as usize * self.record_size;
        pages[page_no].data[start..start + self.record_size].copy_from_slice(data);
        Ok(())
    }
}
