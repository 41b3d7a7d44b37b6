use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::traits::file_sink::FileSink;

/// Writes each file to its own hidden temp file in the destination
/// directory, syncs it, then renames it into place, so readers never see a
/// partially written recording.
///
/// Concurrent writes to the same path never share a temp file; the last
/// rename wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomicFileSink;

impl FileSink for AtomicFileSink {
    fn write(&self, bytes: &[u8], path: &Path) -> io::Result<()> {
        write_atomically(bytes, path)
    }
}

pub(crate) fn write_atomically(bytes: &[u8], path: &Path) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // Removed on drop if anything below fails.
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use std::thread;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn writes_complete_file_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recording_1.wav");

        AtomicFileSink.write(b"RIFF....", &path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"RIFF....");
        assert_eq!(entries(dir.path()), vec!["recording_1.wav"]);
    }

    #[test]
    fn replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.wav");
        fs::write(&path, b"old").unwrap();

        AtomicFileSink.write(b"new", &path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn missing_directory_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("a.wav");

        let err = AtomicFileSink.write(b"data", &path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!path.exists());
    }

    #[test]
    fn concurrent_writes_to_one_path_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let path = Arc::new(dir.path().join("shared.wav"));

        let writers: Vec<_> = (0..8u8)
            .map(|i| {
                let path = Arc::clone(&path);
                thread::spawn(move || AtomicFileSink.write(&[i; 4096], &path))
            })
            .collect();
        for writer in writers {
            writer.join().unwrap().unwrap();
        }

        // One complete payload survives, never a mix.
        let contents = fs::read(path.as_ref()).unwrap();
        assert_eq!(contents.len(), 4096);
        assert!(contents.iter().all(|&b| b == contents[0]));
        assert_eq!(entries(dir.path()), vec!["shared.wav"]);
    }
}
