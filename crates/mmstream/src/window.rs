/// Where the next window goes and whether the file must grow first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowPlan {
    /// Block-aligned start of the window.
    pub offset: u64,
    /// Mapped length in bytes. Equals the block size except for read windows
    /// at the tail of the file.
    pub len: u64,
    /// New file size to truncate to before mapping (write path only).
    pub grow_to: Option<u64>,
}

impl WindowPlan {
    /// Plans the window covering `cursor`.
    ///
    /// Write windows are always a full block and may require growing the file
    /// to `offset + block`. Read windows never reach past `file_size`.
    #[must_use]
    pub fn new(
        cursor: u64,
        block: u64,
        file_size: u64,
        direction: crate::enums::Direction,
    ) -> Self {
        let offset = crate::block::align_down(cursor, block);
        let bound = offset.saturating_add(block);

        match direction {
            crate::enums::Direction::Write => Self {
                offset,
                len: block,
                grow_to: (bound > file_size).then_some(bound),
            },
            crate::enums::Direction::Read => Self {
                offset,
                len: bound.min(file_size).saturating_sub(offset),
                grow_to: None,
            },
        }
    }

    #[inline]
    #[must_use]
    pub fn bound(&self) -> u64 {
        self.offset + self.len
    }
}

#[derive(Debug)]
enum Mapping {
    ReadOnly(memmap2::Mmap),
    ReadWrite(memmap2::MmapMut),
}

/// The currently mapped, block-aligned region of a file.
///
/// At most one mapping is held; establishing a new window always drops the
/// previous one first.
#[derive(Debug, Default)]
pub struct Window {
    offset: u64,
    len: u64,
    mapping: Option<Mapping>,
}

impl Window {
    /// Whether a mapping is held.
    #[inline]
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.mapping.is_some()
    }

    /// A window is stale when nothing is mapped or `cursor` is outside
    /// `offset..bound`.
    #[inline]
    #[must_use]
    pub fn covers(&self, cursor: u64) -> bool {
        self.is_held() && self.offset <= cursor && cursor < self.bound()
    }

    #[inline]
    #[must_use]
    pub fn bound(&self) -> u64 {
        self.offset + self.len
    }

    /// Byte range of the held window, if any.
    #[must_use]
    pub fn range(&self) -> Option<std::ops::Range<u64>> {
        self.is_held().then(|| self.offset..self.bound())
    }

    /// Unmaps the held window. Unmapping cannot report failure.
    pub fn release(&mut self) {
        self.mapping = None;
    }

    /// Replaces the held window with the one described by `plan`.
    ///
    /// The previous mapping is released before the new one is created, so on
    /// error no window is held and the next call starts from scratch. A
    /// zero-length plan holds nothing.
    ///
    /// # Errors
    ///
    /// - `std::io::Error` if the OS refuses the mapping.
    pub fn establish(
        &mut self,
        file: &std::fs::File,
        access: crate::enums::Access,
        plan: &WindowPlan,
    ) -> std::io::Result<()> {
        self.release();
        self.offset = plan.offset;
        self.len = plan.len;

        if plan.len == 0 {
            return Ok(());
        }

        let len = usize::try_from(plan.len)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::FileTooLarge, e))?;
        let mut options = memmap2::MmapOptions::new();
        options.offset(plan.offset).len(len);

        // SAFETY:
        // - `offset` is a multiple of the block size, itself a page multiple
        // - the file is at least `offset + len` bytes long (grown by the caller
        //   on the write path, clamped to its size on the read path)
        // - the mapping is owned here and only reached through `&self`/`&mut self`
        let mapping = if access.can_write() {
            Mapping::ReadWrite(unsafe { options.map_mut(file)? })
        } else {
            Mapping::ReadOnly(unsafe { options.map(file)? })
        };
        self.mapping = Some(mapping);
        Ok(())
    }

    /// Mapped bytes from `position` to the window bound.
    ///
    /// Empty when `position` is not covered.
    #[must_use]
    pub fn bytes_from(&self, position: u64) -> &[u8] {
        let Some(start) = self.local_index(position) else {
            return &[];
        };
        match &self.mapping {
            Some(Mapping::ReadOnly(map)) => &map[start..],
            Some(Mapping::ReadWrite(map)) => &map[start..],
            None => &[],
        }
    }

    /// Writable mapped bytes from `position` to the window bound.
    ///
    /// Empty when `position` is not covered or the mapping is read-only.
    #[must_use]
    pub fn bytes_from_mut(&mut self, position: u64) -> &mut [u8] {
        let Some(start) = self.local_index(position) else {
            return &mut [];
        };
        match &mut self.mapping {
            Some(Mapping::ReadWrite(map)) => &mut map[start..],
            Some(Mapping::ReadOnly(_)) | None => &mut [],
        }
    }

    /// Synchronously writes the held window's dirty pages back to the file.
    ///
    /// # Errors
    ///
    /// - `std::io::Error` if `msync` fails.
    pub fn flush(&self) -> std::io::Result<()> {
        match &self.mapping {
            Some(Mapping::ReadWrite(map)) => map.flush(),
            Some(Mapping::ReadOnly(_)) | None => Ok(()),
        }
    }

    fn local_index(&self, position: u64) -> Option<usize> {
        if !self.covers(position) {
            return None;
        }
        usize::try_from(position - self.offset).ok()
    }
}
