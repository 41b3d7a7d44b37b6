use std::io;
use std::path::Path;

/// Destination for finished export bytes.
///
/// Implementations must either make the whole file visible at `path` or
/// nothing at all.
pub trait FileSink: Send + Sync {
    fn write(&self, bytes: &[u8], path: &Path) -> io::Result<()>;
}

impl<F> FileSink for F
where
    F: Fn(&[u8], &Path) -> io::Result<()> + Send + Sync,
{
    fn write(&self, bytes: &[u8], path: &Path) -> io::Result<()> {
        self(bytes, path)
    }
}
