use super::error::RecordResult;
use super::page::DataPage;
use super::record::{Record, RecordId};
use super::schema::Schema;
use super::table::Table;
use super::value::Value;
use crate::file::PageNumber;

/// Filter evaluated against each scanned record. The returned value must be
/// `Value::Bool`; evaluation errors abort the scan unchanged.
pub trait Predicate {
    fn evaluate(&self, record: &Record, schema: &Schema) -> RecordResult<Value>;
}

impl<F> Predicate for F
where
    F: Fn(&Record, &Schema) -> RecordResult<Value>,
{
    fn evaluate(&self, record: &Record, schema: &Schema) -> RecordResult<Value> {
        self(record, schema)
    }
}

/// Sequential scan over a table's data pages in page-then-slot order.
/// Pins one page at a time; no pin is held between `next` calls.
pub struct Scan<'a> {
    table: &'a mut Table,
    cond: Option<&'a dyn Predicate>,
    page: PageNumber,
    slot: usize,
}

impl<'a> Scan<'a> {
    pub(crate) fn new(table: &'a mut Table, cond: Option<&'a dyn Predicate>) -> Self {
        Self {
            table,
            cond,
            page: 1,
            slot: 0,
        }
    }

    /// The next record satisfying the predicate, or `None` when the scan has
    /// walked past the last data page.
    pub fn next_record(&mut self) -> RecordResult<Option<Record>> {
        let record_size = self.table.record_size();
        let max_slots = self.table.max_slots();

        loop {
            if self.page >= self.table.pool().total_pages() {
                return Ok(None);
            }

            let handle = self.table.pool().pin_page(self.page)?;
            let outcome = loop {
                if self.slot >= max_slots {
                    break Ok(None);
                }
                let slot = self.slot;

                let payload = {
                    let buf = match self.table.pool().page_mut(&handle) {
                        Ok(buf) => buf,
                        Err(e) => break Err(e.into()),
                    };
                    let page = DataPage::attach(buf, record_size);
                    page.slot_in_use(slot).then(|| page.payload(slot).to_vec())
                };

                if let Some(data) = payload {
                    let record = Record::from_bytes(RecordId::new(self.page, slot), data);
                    let matched = match self.cond {
                        None => true,
                        Some(cond) => {
                            match cond
                                .evaluate(&record, self.table.schema())
                                .and_then(|v| v.as_bool())
                            {
                                Ok(b) => b,
                                Err(e) => break Err(e),
                            }
                        }
                    };
                    if matched {
                        self.slot += 1;
                        break Ok(Some(record));
                    }
                }
                self.slot += 1;
            };
            self.table.pool().unpin_page(&handle)?;

            match outcome {
                Ok(Some(record)) => return Ok(Some(record)),
                Err(e) => return Err(e),
                Ok(None) => {
                    self.slot = 0;
                    self.page += 1;
                }
            }
        }
    }
}

impl Iterator for Scan<'_> {
    type Item = RecordResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
