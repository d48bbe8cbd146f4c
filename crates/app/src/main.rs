use anyhow::Context;
use clap::{Parser, Subcommand};

const DEFAULT_CHUNK: usize = 64 * 1024;

#[derive(Parser)]
#[command(name = "mmcp")]
#[command(version, about = "Copy and inspect files through memory-mapped streams", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy a file, replacing the destination
    Copy {
        source: std::path::PathBuf,
        destination: std::path::PathBuf,
        /// Bytes moved per read/write call
        #[arg(long, default_value_t = DEFAULT_CHUNK)]
        chunk: usize,
    },
    /// Write a file to stdout
    Cat {
        path: std::path::PathBuf,
        /// Bytes moved per read call
        #[arg(long, default_value_t = DEFAULT_CHUNK)]
        chunk: usize,
    },
    /// Show size and window geometry of a file
    Info { path: std::path::PathBuf },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Copy {
            source,
            destination,
            chunk,
        } => {
            let copied = copy(&source, &destination, chunk)?;
            tracing::info!(
                source = %source.display(),
                destination = %destination.display(),
                bytes = copied,
                "copy finished"
            );
        }
        Commands::Cat { path, chunk } => {
            let stdout = std::io::stdout();
            cat(&path, chunk, &mut stdout.lock())?;
        }
        Commands::Info { path } => {
            let stream = mmstream::Stream::open(&path, "r")
                .with_context(|| format!("failed to open {}", path.display()))?;
            println!("path:       {}", stream.path().display());
            println!("size:       {}", stream.end());
            println!("block size: {}", stream.block_size());
            println!("access:     {}", stream.access());
        }
    }

    Ok(())
}

/// `-v` count picks the default level; `RUST_LOG` wins when set.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn copy(
    source: &std::path::Path,
    destination: &std::path::Path,
    chunk: usize,
) -> anyhow::Result<u64> {
    anyhow::ensure!(chunk > 0, "chunk size must be positive");

    let mut src = mmstream::Stream::open(source, "r")
        .with_context(|| format!("failed to open {}", source.display()))?;
    // opening the destination truncates it, which would pull the pages out
    // from under the source's mapping
    if same_file(source, destination)? {
        anyhow::bail!(
            "{} and {} are the same file",
            source.display(),
            destination.display()
        );
    }
    let mut dst = mmstream::Stream::open(destination, "w")
        .with_context(|| format!("failed to create {}", destination.display()))?;

    let mut buf = vec![0u8; chunk];
    let mut total = 0u64;
    loop {
        let n = src.read(&mut buf)?;
        if n == 0 {
            break;
        }
        dst.write(&buf[..n])?;
        total += n as u64;
    }

    dst.sync()
        .with_context(|| format!("failed to sync {}", destination.display()))?;
    dst.close();
    Ok(total)
}

/// Whether both paths name the same inode. A missing `b` is never the same.
fn same_file(a: &std::path::Path, b: &std::path::Path) -> anyhow::Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let first = std::fs::metadata(a).with_context(|| format!("failed to stat {}", a.display()))?;
    let second = match std::fs::metadata(b) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e).with_context(|| format!("failed to stat {}", b.display())),
    };
    Ok(first.dev() == second.dev() && first.ino() == second.ino())
}

fn cat(path: &std::path::Path, chunk: usize, out: &mut impl std::io::Write) -> anyhow::Result<u64> {
    anyhow::ensure!(chunk > 0, "chunk size must be positive");

    let mut stream = mmstream::Stream::open(path, "r")
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut buf = vec![0u8; chunk];
    let mut total = 0u64;
    loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])?;
        total += n as u64;
    }
    out.flush()?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_matches_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in.bin");
        let destination = dir.path().join("out.bin");
        let data: Vec<u8> = (0..50_000u32).map(|i| (i % 253) as u8).collect();
        std::fs::write(&source, &data).unwrap();

        // small chunk so copies straddle several windows
        let copied = copy(&source, &destination, 777).unwrap();

        assert_eq!(copied, data.len() as u64);
        assert_eq!(std::fs::read(&destination).unwrap(), data);
    }

    #[test]
    fn test_copy_replaces_longer_destination() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in.bin");
        let destination = dir.path().join("out.bin");
        std::fs::write(&source, b"short").unwrap();
        std::fs::write(&destination, vec![b'x'; 10_000]).unwrap();

        copy(&source, &destination, DEFAULT_CHUNK).unwrap();

        assert_eq!(std::fs::read(&destination).unwrap(), b"short");
    }

    #[test]
    fn test_copy_onto_itself_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("same.bin");
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 241) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let err = copy(&path, &path, 4096).unwrap_err();
        assert!(err.to_string().contains("same file"), "{err}");
        assert_eq!(std::fs::read(&path).unwrap(), data, "source must survive");

        // a different spelling of the same path, and a hard link
        let dotted = dir.path().join(".").join("same.bin");
        assert!(copy(&path, &dotted, 4096).is_err());
        let link = dir.path().join("link.bin");
        std::fs::hard_link(&path, &link).unwrap();
        assert!(copy(&path, &link, 4096).is_err());
        assert_eq!(std::fs::read(&path).unwrap(), data);
    }

    #[test]
    fn test_copy_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("empty.bin");
        let destination = dir.path().join("out.bin");
        std::fs::write(&source, b"").unwrap();

        assert_eq!(copy(&source, &destination, DEFAULT_CHUNK).unwrap(), 0);
        assert_eq!(std::fs::metadata(&destination).unwrap().len(), 0);
    }

    #[test]
    fn test_cat_writes_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        std::fs::write(&path, b"line one\nline two\n").unwrap();

        let mut out = Vec::new();
        assert_eq!(cat(&path, 4, &mut out).unwrap(), 18);
        assert_eq!(out, b"line one\nline two\n");
    }

    #[test]
    fn test_zero_chunk_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        std::fs::write(&path, b"x").unwrap();

        assert!(cat(&path, 0, &mut Vec::new()).is_err());
        assert!(copy(&path, &dir.path().join("out"), 0).is_err());
    }

    #[test]
    fn test_cli_parses_copy() {
        let cli = Cli::try_parse_from(["mmcp", "-vv", "copy", "a", "b", "--chunk", "10"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Copy {
                source,
                destination,
                chunk,
            } => {
                assert_eq!(source, std::path::PathBuf::from("a"));
                assert_eq!(destination, std::path::PathBuf::from("b"));
                assert_eq!(chunk, 10);
            }
            _ => panic!("expected copy"),
        }
    }
}
