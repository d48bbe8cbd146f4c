/// How a stream is opened.
///
/// | tag    | creates | truncates | access |
/// |--------|---------|-----------|--------|
/// | `"r"`  | no      | no        | read   |
/// | `"r+"` | no      | no        | both   |
/// | `"w"`  | yes     | yes       | write  |
/// | `"w+"` | yes     | yes       | both   |
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    ReadUpdate,
    Write,
    WriteUpdate,
}

impl OpenMode {
    /// Capability the stream gets when opened in this mode.
    #[inline]
    #[must_use]
    pub fn access(self) -> Access {
        match self {
            OpenMode::Read => Access::Read,
            OpenMode::Write => Access::Write,
            OpenMode::ReadUpdate | OpenMode::WriteUpdate => Access::ReadWrite,
        }
    }

    /// Whether opening creates a missing file and truncates an existing one.
    #[inline]
    #[must_use]
    pub fn creates(self) -> bool {
        matches!(self, OpenMode::Write | OpenMode::WriteUpdate)
    }

    /// OS-level open options for this mode.
    ///
    /// Write modes always ask for a readable descriptor: a shared writable
    /// mapping cannot be established on a write-only one.
    #[must_use]
    pub fn open_options(self) -> std::fs::OpenOptions {
        let mut options = std::fs::OpenOptions::new();
        match self {
            OpenMode::Read => options.read(true),
            OpenMode::ReadUpdate => options.read(true).write(true),
            OpenMode::Write | OpenMode::WriteUpdate => {
                options.read(true).write(true).create(true).truncate(true)
            }
        };
        options
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OpenMode::Read => "r",
            OpenMode::ReadUpdate => "r+",
            OpenMode::Write => "w",
            OpenMode::WriteUpdate => "w+",
        }
    }
}

impl std::str::FromStr for OpenMode {
    type Err = crate::errors::StreamError;

    /// Only the leading `r`/`w` and a `+` right after it are significant,
    /// so `"rb"` reads and `"w+x"` updates.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let root = chars.next();
        let update = chars.next() == Some('+');
        match (root, update) {
            (Some('r'), true) => Ok(OpenMode::ReadUpdate),
            (Some('r'), false) => Ok(OpenMode::Read),
            (Some('w'), true) => Ok(OpenMode::WriteUpdate),
            (Some('w'), false) => Ok(OpenMode::Write),
            _ => Err(crate::errors::StreamError::InvalidArgument(format!(
                "unknown open mode {s:?}"
            ))),
        }
    }
}

impl std::fmt::Display for OpenMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl Access {
    #[inline]
    #[must_use]
    pub fn can_read(self) -> bool {
        matches!(self, Access::Read | Access::ReadWrite)
    }

    #[inline]
    #[must_use]
    pub fn can_write(self) -> bool {
        matches!(self, Access::Write | Access::ReadWrite)
    }
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Access::Read => write!(f, "read-only"),
            Access::Write => write!(f, "write-only"),
            Access::ReadWrite => write!(f, "read-write"),
        }
    }
}

/// Which copy loop is asking the window manager for a window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Never maps past the real end of the file.
    Read,
    /// Grows the file so a whole block can be mapped.
    Write,
}
