//! Sequential file streams backed by a sliding window of mapped memory.
//!
//! A [`Stream`] offers `open/read/write/seek/tell/sync/close` on a regular
//! file without read/write syscalls: each transfer goes through one mapped,
//! block-aligned window of the file, remapped whenever the cursor leaves it.
//! Writes past the end grow the file a block at a time; closing the stream
//! trims it back to the logical end.
//!
//! ```no_run
//! let mut stream = mmstream::Stream::open("notes.bin", "w+")?;
//! stream.write(b"hello")?;
//! stream.seek(0)?;
//! let mut buf = [0u8; 5];
//! assert_eq!(stream.read(&mut buf)?, 5);
//! stream.close();
//! # Ok::<(), mmstream::StreamError>(())
//! ```
pub mod block;
pub mod enums;
pub mod errors;
pub mod stream;
pub mod window;

pub use enums::{Access, OpenMode};
pub use errors::{StreamError, StreamResult};
pub use stream::Stream;
