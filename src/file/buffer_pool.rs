use std::collections::HashMap;
use std::path::Path;

use super::error::{FileError, FileResult};
use super::page_file::PageFile;
use super::{PageNumber, PAGE_SIZE};

/// Replacement strategy selector. Recorded at pool creation for
/// observability; victim selection itself is the least-usage policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacementStrategy {
    Fifo,
    Lru,
    Clock,
    LruK,
}

/// Handle to a pinned page, returned by `pin_page` and accepted by the
/// page accessors. Valid until the matching `unpin_page`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHandle {
    page_num: PageNumber,
}

impl PageHandle {
    pub fn page_num(&self) -> PageNumber {
        self.page_num
    }
}

/// One page frame: a page-sized buffer plus replacement metadata.
struct Frame {
    /// Page buffer, lazily allocated on first load
    data: Option<Box<[u8]>>,
    /// Resident page, `None` when the frame is free
    page_num: Option<PageNumber>,
    /// True iff the buffer was mutated since load
    dirty: bool,
    /// Outstanding pins; a pinned frame is never a victim
    fix_count: u32,
    /// Reference counter consulted by victim selection
    usage: u64,
}

impl Frame {
    fn unloaded() -> Self {
        Self {
            data: None,
            page_num: None,
            dirty: false,
            fix_count: 0,
            usage: 0,
        }
    }

    fn buf(&self) -> &[u8] {
        self.data.as_deref().unwrap_or(&[])
    }

    fn buf_mut(&mut self) -> &mut [u8] {
        self.data
            .get_or_insert_with(|| vec![0u8; PAGE_SIZE].into_boxed_slice())
    }
}

/// Write a dirty frame's page back to disk and clear its dirty flag.
/// Free function so callers can hold a frame borrow alongside the file.
fn write_back(file: &mut PageFile, frame: &mut Frame, write_io: &mut usize) -> FileResult<()> {
    if let Some(page_num) = frame.page_num {
        file.ensure_capacity(page_num + 1)?;
        file.write_block(page_num, frame.buf())?;
        *write_io += 1;
        frame.dirty = false;
    }
    Ok(())
}

/// Fixed-size cache of pages with pin counting and write-back eviction.
///
/// The pool exclusively owns its page file while open; all block I/O is
/// routed through it.
pub struct BufferPool {
    file: PageFile,
    frames: Vec<Frame>,
    /// Page number -> frame index for O(1) lookup
    page_table: HashMap<PageNumber, usize>,
    strategy: ReplacementStrategy,
    read_io: usize,
    write_io: usize,
}

impl BufferPool {
    /// Open a buffer pool of `num_frames` frames over an existing page file.
    pub fn open<P: AsRef<Path>>(
        path: P,
        num_frames: usize,
        strategy: ReplacementStrategy,
    ) -> FileResult<Self> {
        if num_frames == 0 {
            return Err(FileError::InvalidPoolSize);
        }

        let file = PageFile::open(path)?;
        let frames = (0..num_frames).map(|_| Frame::unloaded()).collect();

        Ok(Self {
            file,
            frames,
            page_table: HashMap::new(),
            strategy,
            read_io: 0,
            write_io: 0,
        })
    }

    /// Pin a page into the pool, loading it from disk on a miss. The file is
    /// grown with zero-filled blocks if `page_num` lies beyond its end.
    pub fn pin_page(&mut self, page_num: PageNumber) -> FileResult<PageHandle> {
        if let Some(&idx) = self.page_table.get(&page_num) {
            let frame = &mut self.frames[idx];
            frame.fix_count += 1;
            frame.usage += 1;
            return Ok(PageHandle { page_num });
        }

        let idx = match self.frames.iter().position(|f| f.page_num.is_none()) {
            Some(free) => free,
            None => self.select_victim(page_num)?,
        };

        if self.frames[idx].dirty {
            write_back(&mut self.file, &mut self.frames[idx], &mut self.write_io)?;
        }
        if let Some(old) = self.frames[idx].page_num {
            self.page_table.remove(&old);
        }

        self.file.ensure_capacity(page_num + 1)?;
        let frame = &mut self.frames[idx];
        self.file.read_block(page_num, frame.buf_mut())?;
        self.read_io += 1;

        frame.page_num = Some(page_num);
        frame.dirty = false;
        frame.fix_count = 1;
        frame.usage = 1;
        self.page_table.insert(page_num, idx);

        Ok(PageHandle { page_num })
    }

    /// Release one pin on the page. Unpinning an already-unpinned page is a
    /// guarded no-op.
    pub fn unpin_page(&mut self, handle: &PageHandle) -> FileResult<()> {
        let idx = self.frame_index(handle)?;
        let frame = &mut self.frames[idx];
        if frame.fix_count > 0 {
            frame.fix_count -= 1;
        }
        Ok(())
    }

    /// Flag the page's frame as modified.
    pub fn mark_dirty(&mut self, handle: &PageHandle) -> FileResult<()> {
        let idx = self.frame_index(handle)?;
        self.frames[idx].dirty = true;
        Ok(())
    }

    /// Write the page back to disk now if it is dirty.
    pub fn force_page(&mut self, handle: &PageHandle) -> FileResult<()> {
        let idx = self.frame_index(handle)?;
        if self.frames[idx].dirty {
            write_back(&mut self.file, &mut self.frames[idx], &mut self.write_io)?;
        }
        Ok(())
    }

    /// Write back every dirty, unpinned frame. A barrier: on success all
    /// acknowledged mutations of unpinned pages are on disk.
    pub fn force_flush(&mut self) -> FileResult<()> {
        for frame in &mut self.frames {
            if frame.dirty && frame.fix_count == 0 {
                write_back(&mut self.file, frame, &mut self.write_io)?;
            }
        }
        self.file.sync()?;
        Ok(())
    }

    /// Flush and release the pool. Fails if any page is still pinned.
    pub fn shutdown(mut self) -> FileResult<()> {
        self.force_flush()?;
        for frame in &self.frames {
            if frame.fix_count > 0 {
                // Frame holds a page if it has pins
                let page = frame.page_num.unwrap_or_default();
                return Err(FileError::PinnedAtShutdown(page));
            }
        }
        Ok(())
    }

    /// Borrow the pinned page's bytes.
    pub fn page(&self, handle: &PageHandle) -> FileResult<&[u8]> {
        let idx = self.frame_index(handle)?;
        Ok(self.frames[idx].buf())
    }

    /// Mutably borrow the pinned page's bytes. The caller is responsible for
    /// `mark_dirty`; mutation alone does not flag the frame.
    pub fn page_mut(&mut self, handle: &PageHandle) -> FileResult<&mut [u8]> {
        let idx = self.frame_index(handle)?;
        Ok(self.frames[idx].buf_mut())
    }

    /// Number of pages in the underlying file.
    pub fn total_pages(&self) -> usize {
        self.file.total_pages()
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn strategy(&self) -> ReplacementStrategy {
        self.strategy
    }

    /// Page resident in each frame, `None` for free frames.
    pub fn frame_contents(&self) -> Vec<Option<PageNumber>> {
        self.frames.iter().map(|f| f.page_num).collect()
    }

    pub fn dirty_flags(&self) -> Vec<bool> {
        self.frames.iter().map(|f| f.dirty).collect()
    }

    pub fn fix_counts(&self) -> Vec<u32> {
        self.frames.iter().map(|f| f.fix_count).collect()
    }

    /// Physical block reads performed since the pool was opened.
    pub fn num_read_io(&self) -> usize {
        self.read_io
    }

    /// Physical block writes performed since the pool was opened.
    pub fn num_write_io(&self) -> usize {
        self.write_io
    }

    fn frame_index(&self, handle: &PageHandle) -> FileResult<usize> {
        self.page_table
            .get(&handle.page_num)
            .copied()
            .ok_or(FileError::PageNotResident(handle.page_num))
    }

    /// Least-usage victim: among unpinned frames, the smallest usage counter,
    /// ties broken by lowest frame index. Fails when every frame is pinned; a
    /// pinned frame is never evicted.
    fn select_victim(&self, page_num: PageNumber) -> FileResult<usize> {
        let mut victim: Option<(usize, u64)> = None;
        for (idx, frame) in self.frames.iter().enumerate() {
            if frame.fix_count == 0 {
                match victim {
                    Some((_, best)) if frame.usage >= best => {}
                    _ => victim = Some((idx, frame.usage)),
                }
            }
        }
        victim
            .map(|(idx, _)| idx)
            .ok_or(FileError::PoolExhausted(page_num))
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        // Best effort: don't lose acknowledged writes on an abandoned pool
        for frame in &mut self.frames {
            if frame.dirty && frame.fix_count == 0 {
                let _ = write_back(&mut self.file, frame, &mut self.write_io);
            }
        }
        let _ = self.file.sync();
    }
}
