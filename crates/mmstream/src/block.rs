/// Largest size or offset a stream will address.
pub const MAX_OFFSET: u64 = i64::MAX as u64;

/// System page size in bytes.
///
/// # Errors
///
/// - `StreamError::Unsupported` if the platform reports no usable page size.
pub fn page_size() -> crate::errors::StreamResult<u64> {
    // SAFETY: sysconf only reads a system constant.
    let raw = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    u64::try_from(raw)
        .ok()
        .filter(|&size| size > 0)
        .ok_or(crate::errors::StreamError::Unsupported(
            "system page size is unavailable",
        ))
}

/// Window alignment for a file.
///
/// Starts at `page` and upgrades to the filesystem's `preferred` I/O size
/// only when it is a whole multiple (more than one) of the page size, so
/// every window offset stays page aligned.
#[must_use]
pub fn effective_block_size(page: u64, preferred: u64) -> u64 {
    if preferred > page
        && preferred < MAX_OFFSET
        && preferred % page == 0
        && preferred / page > 1
    {
        preferred
    } else {
        page
    }
}

/// `position` rounded down to a multiple of `block`.
#[inline]
#[must_use]
pub fn align_down(position: u64, block: u64) -> u64 {
    (position / block) * block
}
