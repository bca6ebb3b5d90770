use super::record::SlotId;
use crate::file::PAGE_SIZE;

/// Bytes reserved for the `slots_used` counter at the head of a data page.
const HEADER_SIZE: usize = 4;

/// Zero-copy view of a data page pinned in the buffer pool.
///
/// Layout: `slots_used` (u32 LE) at offset 0, one directory byte per slot
/// (0 = free, 1 = used), then `max_slots` fixed-width payloads.
pub struct DataPage<'a> {
    buf: &'a mut [u8],
    record_size: usize,
    max_slots: usize,
}

impl<'a> DataPage<'a> {
    /// Slots that fit on one page for the given record width: each slot
    /// costs one directory byte plus its payload.
    pub fn max_slots(record_size: usize) -> usize {
        (PAGE_SIZE - HEADER_SIZE) / (record_size + 1)
    }

    /// Format `buf` as an empty data page.
    pub fn init(buf: &'a mut [u8], record_size: usize) -> Self {
        debug_assert_eq!(buf.len(), PAGE_SIZE);
        buf.fill(0);
        Self {
            buf,
            record_size,
            max_slots: Self::max_slots(record_size),
        }
    }

    /// Wrap an already-formatted data page.
    pub fn attach(buf: &'a mut [u8], record_size: usize) -> Self {
        debug_assert_eq!(buf.len(), PAGE_SIZE);
        Self {
            buf,
            record_size,
            max_slots: Self::max_slots(record_size),
        }
    }

    pub fn capacity(&self) -> usize {
        self.max_slots
    }

    /// Records currently stored on this page.
    pub fn slots_used(&self) -> usize {
        let mut b = [0u8; 4];
        b.copy_from_slice(&self.buf[..HEADER_SIZE]);
        u32::from_le_bytes(b) as usize
    }

    fn set_slots_used(&mut self, n: usize) {
        self.buf[..HEADER_SIZE].copy_from_slice(&(n as u32).to_le_bytes());
    }

    pub fn is_full(&self) -> bool {
        self.slots_used() == self.max_slots
    }

    pub fn slot_in_use(&self, slot: SlotId) -> bool {
        debug_assert!(slot < self.max_slots);
        self.buf[HEADER_SIZE + slot] != 0
    }

    /// First free slot in directory order, `None` when the page is full.
    pub fn find_free_slot(&self) -> Option<SlotId> {
        (0..self.max_slots).find(|&slot| !self.slot_in_use(slot))
    }

    pub fn payload(&self, slot: SlotId) -> &[u8] {
        let start = self.payload_offset(slot);
        &self.buf[start..start + self.record_size]
    }

    /// Store `bytes` in `slot` and mark it used.
    pub fn put(&mut self, slot: SlotId, bytes: &[u8]) {
        debug_assert_eq!(bytes.len(), self.record_size);
        let start = self.payload_offset(slot);
        self.buf[start..start + self.record_size].copy_from_slice(bytes);
        if !self.slot_in_use(slot) {
            self.buf[HEADER_SIZE + slot] = 1;
            let used = self.slots_used() + 1;
            self.set_slots_used(used);
        }
    }

    /// Overwrite the payload of an already-used slot.
    pub fn overwrite(&mut self, slot: SlotId, bytes: &[u8]) {
        debug_assert!(self.slot_in_use(slot));
        debug_assert_eq!(bytes.len(), self.record_size);
        let start = self.payload_offset(slot);
        self.buf[start..start + self.record_size].copy_from_slice(bytes);
    }

    /// Free `slot`, leaving the payload bytes as a tombstone. Returns whether
    /// the slot was in use.
    pub fn clear_slot(&mut self, slot: SlotId) -> bool {
        if self.slot_in_use(slot) {
            self.buf[HEADER_SIZE + slot] = 0;
            let used = self.slots_used() - 1;
            self.set_slots_used(used);
            true
        } else {
            false
        }
    }

    fn payload_offset(&self, slot: SlotId) -> usize {
        debug_assert!(slot < self.max_slots);
        HEADER_SIZE + self.max_slots + slot * self.record_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_slots() {
        // (4096 - 4) / (R + 1)
        assert_eq!(DataPage::max_slots(8), 454);
        assert_eq!(DataPage::max_slots(1023), 3);
        assert_eq!(DataPage::max_slots(4092), 0);
    }

    #[test]
    fn test_init_empty() {
        let mut buf = vec![0xffu8; PAGE_SIZE];
        let page = DataPage::init(&mut buf, 8);
        assert_eq!(page.slots_used(), 0);
        assert_eq!(page.find_free_slot(), Some(0));
        assert!(!page.is_full());
    }

    #[test]
    fn test_put_and_read_back() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut page = DataPage::init(&mut buf, 4);

        page.put(0, &[1, 2, 3, 4]);
        page.put(1, &[5, 6, 7, 8]);

        assert_eq!(page.slots_used(), 2);
        assert!(page.slot_in_use(0));
        assert!(page.slot_in_use(1));
        assert_eq!(page.payload(0), &[1, 2, 3, 4]);
        assert_eq!(page.payload(1), &[5, 6, 7, 8]);
    }

    #[test]
    fn test_find_free_slot_skips_used() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut page = DataPage::init(&mut buf, 4);

        page.put(0, &[0; 4]);
        page.put(1, &[0; 4]);
        assert_eq!(page.find_free_slot(), Some(2));

        page.clear_slot(0);
        assert_eq!(page.find_free_slot(), Some(0));
    }

    #[test]
    fn test_clear_slot_counts() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut page = DataPage::init(&mut buf, 4);

        page.put(0, &[9; 4]);
        assert!(page.clear_slot(0));
        assert_eq!(page.slots_used(), 0);
        assert!(!page.slot_in_use(0));

        // Clearing a free slot reports false and changes nothing
        assert!(!page.clear_slot(0));
        assert_eq!(page.slots_used(), 0);
    }

    #[test]
    fn test_tombstone_keeps_payload() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut page = DataPage::init(&mut buf, 4);

        page.put(0, &[9; 4]);
        page.clear_slot(0);
        assert_eq!(page.payload(0), &[9; 4]);
    }

    #[test]
    fn test_fill_page() {
        let record_size = 1000;
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut page = DataPage::init(&mut buf, record_size);
        let capacity = page.capacity();
        assert_eq!(capacity, DataPage::max_slots(record_size));

        for slot in 0..capacity {
            assert!(!page.is_full());
            page.put(slot, &vec![slot as u8; record_size]);
        }
        assert!(page.is_full());
        assert_eq!(page.find_free_slot(), None);
    }

    #[test]
    fn test_directory_matches_counter() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut page = DataPage::init(&mut buf, 16);

        for slot in [0, 2, 5, 7] {
            page.put(slot, &[1; 16]);
        }
        page.clear_slot(2);

        let directory_count = (0..page.capacity()).filter(|&s| page.slot_in_use(s)).count();
        assert_eq!(directory_count, page.slots_used());
    }

    #[test]
    fn test_attach_sees_existing_data() {
        let mut buf = vec![0u8; PAGE_SIZE];
        {
            let mut page = DataPage::init(&mut buf, 4);
            page.put(3, &[4, 3, 2, 1]);
        }
        let page = DataPage::attach(&mut buf, 4);
        assert_eq!(page.slots_used(), 1);
        assert!(page.slot_in_use(3));
        assert_eq!(page.payload(3), &[4, 3, 2, 1]);
    }
}
