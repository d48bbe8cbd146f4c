use crate::enums::{Access, Direction, OpenMode};
use crate::errors::{StreamError, StreamResult};

/// A sequential byte stream over a file, served through a sliding window of
/// mapped memory instead of read/write syscalls.
///
/// - `cursor` is the next byte read or written; `0 <= cursor <= end` outside
///   of a write in progress.
/// - `end` is the logical end of the stream. It only grows while the stream
///   is open.
/// - `size` tracks the on-disk size, which runs ahead of `end` when a write
///   window grew the file to a whole block. Closing (or dropping) the stream
///   truncates the file back to `end`.
///
/// Not meant to be shared between threads without external locking.
#[derive(Debug)]
pub struct Stream {
    file: std::fs::File,
    path: std::path::PathBuf,
    mode: OpenMode,
    access: Access,
    block: u64,
    cursor: u64,
    end: u64,
    size: u64,
    window: crate::window::Window,
}

/*

===================================
===== OPEN, SYNC, & CLOSE =========
===================================

*/

impl Stream {
    /// Opens `path` with a stdio-style mode tag (`"r"`, `"r+"`, `"w"`, `"w+"`).
    ///
    /// # Errors
    ///
    /// - `StreamError::InvalidArgument` if the path is empty or the mode is not
    ///   read- or write-rooted.
    /// - See [`Stream::open_with`] for the rest.
    pub fn open(path: impl AsRef<std::path::Path>, mode: &str) -> StreamResult<Self> {
        let mode = mode.parse::<OpenMode>()?;
        Self::open_with(path, mode)
    }

    /// Opens `path` in `mode`.
    ///
    /// Write modes create a missing file and truncate an existing one. No
    /// window is mapped until the first read or write.
    ///
    /// # Errors
    ///
    /// - `StreamError::InvalidArgument` if the path is empty.
    /// - `StreamError::Unsupported` if the page size cannot be determined.
    /// - `StreamError::FileTooLarge` if the file is larger than a signed
    ///   64-bit offset can address.
    /// - `StreamError::Io` if the file cannot be opened or inspected.
    pub fn open_with(path: impl AsRef<std::path::Path>, mode: OpenMode) -> StreamResult<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(StreamError::InvalidArgument("empty path".into()));
        }

        let page = crate::block::page_size()?;

        // From here on `file` closes itself on every early return.
        let file = mode.open_options().open(path)?;
        let metadata = file.metadata()?;

        let size = metadata.len();
        if size > crate::block::MAX_OFFSET {
            return Err(StreamError::FileTooLarge);
        }

        let preferred = std::os::unix::fs::MetadataExt::blksize(&metadata);
        let block = crate::block::effective_block_size(page, preferred);

        tracing::debug!(
            path = %path.display(),
            %mode,
            size,
            block,
            "opened stream"
        );

        Ok(Self {
            file,
            path: path.to_path_buf(),
            mode,
            access: mode.access(),
            block,
            cursor: 0,
            end: size,
            size,
            window: crate::window::Window::default(),
        })
    }

    /// Flushes the held window's modified pages to the file.
    ///
    /// Succeeds without doing anything when no window is held. Cursor, end
    /// and window are left untouched.
    ///
    /// # Errors
    ///
    /// - `StreamError::Io` if the pages cannot be written back.
    pub fn sync(&self) -> StreamResult<()> {
        self.window.flush()?;
        Ok(())
    }

    /// Finalizes the stream.
    ///
    /// Unmaps the window, truncates the file down to [`Stream::end`] if a
    /// write window left it longer, and closes the descriptor. Failures are
    /// logged and otherwise ignored. Dropping the stream does the same.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        self.window.release();

        if self.size > self.end {
            match self.file.set_len(self.end) {
                Ok(()) => tracing::debug!(
                    path = %self.path.display(),
                    from = self.size,
                    to = self.end,
                    "trimmed over-allocated tail"
                ),
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "could not trim stream file to its end"
                ),
            }
        }
    }
}

/*

==============================
===== WINDOW MANAGEMENT ======
==============================

*/

impl Stream {
    /// Makes sure the held window covers the cursor, remapping if it is stale.
    ///
    /// The write path grows the file so a whole block can be mapped; the read
    /// path never maps past the file's real end.
    fn ensure_window(&mut self, direction: Direction) -> StreamResult<()> {
        if self.window.covers(self.cursor) {
            return Ok(());
        }

        self.window.release();

        let plan = crate::window::WindowPlan::new(self.cursor, self.block, self.size, direction);

        if let Some(new_size) = plan.grow_to {
            self.file.set_len(new_size)?;
            tracing::debug!(from = self.size, to = new_size, "grew stream file");
            self.size = new_size;
        }

        self.window.establish(&self.file, self.access, &plan)?;
        tracing::trace!(
            ?direction,
            offset = plan.offset,
            len = plan.len,
            "remapped window"
        );
        Ok(())
    }
}

/*

=======================
===== READ & WRITE ====
=======================

*/

impl Stream {
    /// Writes all of `buf` at the cursor, overwriting or extending the stream.
    ///
    /// Returns `buf.len()`; there are no short writes. Bytes land in a shared
    /// mapping of the file, so they survive the stream being closed without
    /// a [`Stream::sync`].
    ///
    /// # Errors
    ///
    /// - `StreamError::PermissionDenied` if the stream was opened read-only.
    /// - `StreamError::FileTooLarge` if the write would end past the largest
    ///   addressable offset.
    /// - `StreamError::Io` if the file cannot be grown or mapped. Bytes copied
    ///   before the failure stay written and the cursor reflects them.
    pub fn write(&mut self, buf: &[u8]) -> StreamResult<usize> {
        if !self.access.can_write() {
            return Err(StreamError::PermissionDenied(self.access));
        }

        let len = u64::try_from(buf.len()).map_err(|_| StreamError::FileTooLarge)?;
        self.cursor
            .checked_add(len)
            .filter(|&target| target <= crate::block::MAX_OFFSET)
            .ok_or(StreamError::FileTooLarge)?;

        let mut written = 0;
        while written < buf.len() {
            self.ensure_window(Direction::Write)?;

            let dst = self.window.bytes_from_mut(self.cursor);
            let count = dst.len().min(buf.len() - written);
            dst[..count].copy_from_slice(&buf[written..written + count]);

            self.cursor += count as u64;
            written += count;

            if self.cursor > self.end {
                self.end = self.cursor;
            }
        }

        Ok(written)
    }

    /// Reads up to `buf.len()` bytes from the cursor.
    ///
    /// Returns fewer bytes when the stream ends first and `0` at the end.
    ///
    /// # Errors
    ///
    /// - `StreamError::PermissionDenied` if the stream was opened write-only.
    /// - `StreamError::Io` if a window cannot be mapped.
    pub fn read(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        if !self.access.can_read() {
            return Err(StreamError::PermissionDenied(self.access));
        }

        let remaining = self.end.saturating_sub(self.cursor);
        let wanted = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));

        let mut read = 0;
        while read < wanted {
            self.ensure_window(Direction::Read)?;

            let src = self.window.bytes_from(self.cursor);
            let count = src.len().min(wanted - read);
            if count == 0 {
                break;
            }
            buf[read..read + count].copy_from_slice(&src[..count]);

            self.cursor += count as u64;
            read += count;
        }

        Ok(read)
    }
}

/*

===============================
===== POSITION & ACCESSORS ====
===============================

*/

impl Stream {
    /// Moves the cursor.
    ///
    /// Non-negative positions are absolute; negative ones are added to
    /// [`Stream::end`]. The held window is not touched; a stale window is
    /// only replaced by the next read or write.
    ///
    /// # Errors
    ///
    /// - `StreamError::OutOfRange` if the resolved position is negative or
    ///   past the end.
    pub fn seek(&mut self, pos: i64) -> StreamResult<u64> {
        let resolved = if pos < 0 {
            i128::from(pos) + i128::from(self.end)
        } else {
            i128::from(pos)
        };
        self.seek_resolved(resolved)
    }

    fn seek_resolved(&mut self, resolved: i128) -> StreamResult<u64> {
        let position = u64::try_from(resolved)
            .ok()
            .filter(|&p| p <= self.end)
            .ok_or(StreamError::OutOfRange {
                position: resolved,
                end: self.end,
            })?;
        self.cursor = position;
        Ok(position)
    }

    /// Current cursor position.
    #[inline]
    #[must_use]
    pub fn tell(&self) -> u64 {
        self.cursor
    }

    /// Logical end of the stream.
    #[inline]
    #[must_use]
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Window alignment chosen at open.
    #[inline]
    #[must_use]
    pub fn block_size(&self) -> u64 {
        self.block
    }

    /// Current on-disk size, including any over-allocated tail.
    #[inline]
    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.size
    }

    #[inline]
    #[must_use]
    pub fn access(&self) -> Access {
        self.access
    }

    #[inline]
    #[must_use]
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// File range of the held window, if any.
    #[inline]
    #[must_use]
    pub fn window_range(&self) -> Option<std::ops::Range<u64>> {
        self.window.range()
    }
}

/*

===========================
===== std::io ADAPTERS ====
===========================

*/

impl std::io::Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(Stream::read(self, buf)?)
    }
}

impl std::io::Write for Stream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Ok(Stream::write(self, buf)?)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(self.sync()?)
    }
}

impl std::io::Seek for Stream {
    /// Same bounds as [`Stream::seek`]: the target must land in `0..=end`.
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        let resolved = match pos {
            std::io::SeekFrom::Start(n) => i128::from(n),
            std::io::SeekFrom::End(n) => i128::from(self.end) + i128::from(n),
            std::io::SeekFrom::Current(n) => i128::from(self.cursor) + i128::from(n),
        };
        Ok(self.seek_resolved(resolved)?)
    }

    fn stream_position(&mut self) -> std::io::Result<u64> {
        Ok(self.cursor)
    }
}
