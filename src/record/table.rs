use std::path::Path;

use super::error::{RecordError, RecordResult};
use super::meta::TableMeta;
use super::page::DataPage;
use super::record::{Record, RecordId};
use super::scan::{Predicate, Scan};
use super::schema::Schema;
use super::TABLE_POOL_FRAMES;
use crate::file::{BufferPool, PageFile, PageNumber, ReplacementStrategy};

/// An open table: a page file driven through a private buffer pool, with
/// metadata on page 0 and slot-directory data pages from page 1 on.
pub struct Table {
    schema: Schema,
    pool: BufferPool,
    num_tuples: usize,
    /// Page believed to have a free slot; repaired on insert when stale
    next_free_page: Option<PageNumber>,
    record_size: usize,
    max_slots: usize,
}

impl Table {
    /// Create the table file and persist the schema on page 0.
    pub fn create<P: AsRef<Path>>(path: P, schema: &Schema) -> RecordResult<()> {
        let record_size = schema.record_size();
        if DataPage::max_slots(record_size) == 0 {
            return Err(RecordError::RecordTooLarge(record_size));
        }

        PageFile::create(&path)?;
        let mut pool = BufferPool::open(&path, TABLE_POOL_FRAMES, ReplacementStrategy::Lru)?;
        let meta = TableMeta {
            num_tuples: 0,
            next_free_page: None,
            schema: schema.clone(),
        };
        write_meta(&mut pool, &meta)?;
        pool.shutdown()?;
        Ok(())
    }

    /// Open an existing table, reconstructing the schema from page 0.
    pub fn open<P: AsRef<Path>>(path: P) -> RecordResult<Self> {
        let mut pool = BufferPool::open(&path, TABLE_POOL_FRAMES, ReplacementStrategy::Lru)?;
        let meta = read_meta(&mut pool)?;

        let record_size = meta.schema.record_size();
        let max_slots = DataPage::max_slots(record_size);
        if max_slots == 0 {
            return Err(RecordError::RecordTooLarge(record_size));
        }

        Ok(Self {
            schema: meta.schema,
            pool,
            num_tuples: meta.num_tuples,
            next_free_page: meta.next_free_page,
            record_size,
            max_slots,
        })
    }

    /// Write metadata back to page 0 and shut the pool down.
    pub fn close(self) -> RecordResult<()> {
        let Table {
            schema,
            mut pool,
            num_tuples,
            next_free_page,
            ..
        } = self;

        let meta = TableMeta {
            num_tuples,
            next_free_page,
            schema,
        };
        write_meta(&mut pool, &meta)?;
        pool.shutdown()?;
        Ok(())
    }

    /// Remove the table file from disk.
    pub fn destroy<P: AsRef<Path>>(path: P) -> RecordResult<()> {
        PageFile::destroy(path)?;
        Ok(())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn num_tuples(&self) -> usize {
        self.num_tuples
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Records that fit on one data page.
    pub fn max_slots(&self) -> usize {
        self.max_slots
    }

    pub(crate) fn pool(&mut self) -> &mut BufferPool {
        &mut self.pool
    }

    /// Place a record in the first free slot of the hinted page, allocating
    /// a fresh data page when no page is known to have space. Stamps and
    /// returns the record's RID.
    pub fn insert(&mut self, record: &mut Record) -> RecordResult<RecordId> {
        self.check_record_size(record)?;

        loop {
            let page_num = match self.next_free_page {
                Some(p) => p,
                None => self.allocate_data_page()?,
            };

            let handle = self.pool.pin_page(page_num)?;
            let slot = {
                let buf = self.pool.page_mut(&handle)?;
                let mut page = DataPage::attach(buf, self.record_size);
                match page.find_free_slot() {
                    Some(slot) => {
                        page.put(slot, record.data());
                        Some((slot, page.is_full()))
                    }
                    None => None,
                }
            };

            match slot {
                Some((slot, full)) => {
                    self.pool.mark_dirty(&handle)?;
                    self.pool.unpin_page(&handle)?;

                    self.num_tuples += 1;
                    self.next_free_page = if full { None } else { Some(page_num) };

                    let rid = RecordId::new(page_num, slot);
                    record.id = Some(rid);
                    return Ok(rid);
                }
                None => {
                    // Stale hint: the page filled since it was recorded
                    self.next_free_page = None;
                    self.pool.unpin_page(&handle)?;
                }
            }
        }
    }

    /// Copy the record at `id` out of its page.
    pub fn get(&mut self, id: RecordId) -> RecordResult<Record> {
        self.check_rid(id)?;
        if id.page >= self.pool.total_pages() {
            return Err(RecordError::SlotEmpty {
                page: id.page,
                slot: id.slot,
            });
        }

        let handle = self.pool.pin_page(id.page)?;
        let payload = {
            let buf = self.pool.page_mut(&handle)?;
            let page = DataPage::attach(buf, self.record_size);
            page.slot_in_use(id.slot).then(|| page.payload(id.slot).to_vec())
        };
        self.pool.unpin_page(&handle)?;

        match payload {
            Some(data) => Ok(Record::from_bytes(id, data)),
            None => Err(RecordError::SlotEmpty {
                page: id.page,
                slot: id.slot,
            }),
        }
    }

    /// Overwrite the record at `id` in place. The slot must be in use.
    pub fn update(&mut self, id: RecordId, record: &Record) -> RecordResult<()> {
        self.check_record_size(record)?;
        self.check_rid(id)?;
        if id.page >= self.pool.total_pages() {
            return Err(RecordError::SlotEmpty {
                page: id.page,
                slot: id.slot,
            });
        }

        let handle = self.pool.pin_page(id.page)?;
        let updated = {
            let buf = self.pool.page_mut(&handle)?;
            let mut page = DataPage::attach(buf, self.record_size);
            if page.slot_in_use(id.slot) {
                page.overwrite(id.slot, record.data());
                true
            } else {
                false
            }
        };

        if updated {
            self.pool.mark_dirty(&handle)?;
        }
        self.pool.unpin_page(&handle)?;

        if updated {
            Ok(())
        } else {
            Err(RecordError::SlotEmpty {
                page: id.page,
                slot: id.slot,
            })
        }
    }

    /// Free the slot at `id`, leaving the payload as a tombstone. Deleting an
    /// already-free slot is a silent no-op.
    pub fn delete(&mut self, id: RecordId) -> RecordResult<()> {
        self.check_rid(id)?;
        if id.page >= self.pool.total_pages() {
            return Ok(());
        }

        let handle = self.pool.pin_page(id.page)?;
        let freed = {
            let buf = self.pool.page_mut(&handle)?;
            let mut page = DataPage::attach(buf, self.record_size);
            page.clear_slot(id.slot).then(|| page.slots_used())
        };

        match freed {
            Some(slots_used) => {
                self.pool.mark_dirty(&handle)?;
                self.pool.unpin_page(&handle)?;

                self.num_tuples = self.num_tuples.saturating_sub(1);
                // The page just went from full to non-full: adopt it
                if slots_used == self.max_slots - 1 {
                    self.next_free_page = Some(id.page);
                }
            }
            None => self.pool.unpin_page(&handle)?,
        }
        Ok(())
    }

    /// Sequential scan over all records, optionally filtered by a predicate.
    pub fn scan<'a>(&'a mut self, cond: Option<&'a dyn Predicate>) -> Scan<'a> {
        Scan::new(self, cond)
    }

    /// Append a zeroed page, format its slot directory, adopt it as the
    /// free-page hint.
    fn allocate_data_page(&mut self) -> RecordResult<PageNumber> {
        let page_num = self.pool.total_pages();

        let handle = self.pool.pin_page(page_num)?;
        {
            let buf = self.pool.page_mut(&handle)?;
            DataPage::init(buf, self.record_size);
        }
        self.pool.mark_dirty(&handle)?;
        self.pool.unpin_page(&handle)?;

        self.next_free_page = Some(page_num);
        Ok(page_num)
    }

    fn check_rid(&self, id: RecordId) -> RecordResult<()> {
        if id.page < 1 || id.slot >= self.max_slots {
            return Err(RecordError::SlotOutOfRange {
                page: id.page,
                slot: id.slot,
                max_slots: self.max_slots,
            });
        }
        Ok(())
    }

    fn check_record_size(&self, record: &Record) -> RecordResult<()> {
        if record.data().len() != self.record_size {
            return Err(RecordError::RecordSizeMismatch {
                expected: self.record_size,
                actual: record.data().len(),
            });
        }
        Ok(())
    }
}

/// Pin page 0, render the metadata, and force it to disk.
fn write_meta(pool: &mut BufferPool, meta: &TableMeta) -> RecordResult<()> {
    let handle = pool.pin_page(0)?;
    let result = meta.encode(pool.page_mut(&handle)?);
    if result.is_ok() {
        pool.mark_dirty(&handle)?;
    }
    pool.unpin_page(&handle)?;
    result?;
    pool.force_page(&handle)?;
    Ok(())
}

fn read_meta(pool: &mut BufferPool) -> RecordResult<TableMeta> {
    let handle = pool.pin_page(0)?;
    let meta = TableMeta::decode(pool.page(&handle)?);
    pool.unpin_page(&handle)?;
    meta
}
