// ============================================================
// Layer 6 — Dataset Download
// ============================================================
// Fetches a dataset file into a local cache directory:
//
//   ROOT/
//     pose.safetensors        ← final file, reused on later runs
//     pose.safetensors.part   ← in-flight download
//
// The body is streamed to the `.part` file and renamed once the
// transfer is complete, so an interrupted run never leaves a
// truncated file that would be mistaken for a cached one.

use anyhow::{bail, Context, Result};
use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

/// Download `url` to `output_dir/file_name` unless the file is already there.
/// Returns the path of the cached file.
pub fn download_file_by_url(url: &str, output_dir: &Path, file_name: &str) -> Result<PathBuf> {
    let target = output_dir.join(file_name);
    if target.exists() {
        tracing::info!("Using cached dataset '{}'", target.display());
        return Ok(target);
    }

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Cannot create directory '{}'", output_dir.display()))?;

    tracing::info!("Downloading {} → '{}'", url, target.display());
    let response = ureq::get(url)
        .call()
        .with_context(|| format!("Download failed: {url}"))?;

    let expected = response
        .header("Content-Length")
        .and_then(|v| v.parse::<u64>().ok());

    let partial = output_dir.join(format!("{file_name}.part"));
    let written = write_stream(response.into_reader(), &partial)?;

    if let Some(total) = expected {
        if written != total {
            fs::remove_file(&partial).ok();
            bail!("Download incomplete for '{url}': expected {total} bytes, got {written}");
        }
    }

    fs::rename(&partial, &target)
        .with_context(|| format!("Cannot move '{}' into place", partial.display()))?;
    tracing::info!("Downloaded {} bytes", written);
    Ok(target)
}

/// Copy `reader` into a fresh file at `path`. The file is removed again if
/// the copy fails partway.
fn write_stream(mut reader: impl Read, path: &Path) -> Result<u64> {
    let mut file = fs::File::create(path)
        .with_context(|| format!("Cannot create '{}'", path.display()))?;
    match io::copy(&mut reader, &mut file) {
        Ok(n) => Ok(n),
        Err(e) => {
            drop(file);
            fs::remove_file(path).ok();
            Err(e).with_context(|| format!("Cannot write '{}'", path.display()))
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_existing_file_is_not_downloaded() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("pose.safetensors"), b"cached").unwrap();

        // The URL is unroutable: reaching the network would fail the test.
        let path = download_file_by_url("http://invalid.invalid/pose", dir.path(), "pose.safetensors")
            .unwrap();
        assert_eq!(fs::read(path).unwrap(), b"cached");
    }

    #[test]
    fn test_failed_download_leaves_no_file() {
        let dir = tempdir().unwrap();
        let result = download_file_by_url("http://invalid.invalid/pose", dir.path(), "pose.safetensors");
        assert!(result.is_err());
        assert!(!dir.path().join("pose.safetensors").exists());
    }

    #[test]
    fn test_write_stream_counts_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let n = write_stream(&b"hello world"[..], &path).unwrap();
        assert_eq!(n, 11);
        assert_eq!(fs::read(path).unwrap(), b"hello world");
    }

    /// Yields some bytes, then fails like a dropped connection.
    struct BrokenReader(usize);

    impl Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0 == 0 {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"));
            }
            let n = self.0.min(buf.len());
            buf[..n].fill(7);
            self.0 -= n;
            Ok(n)
        }
    }

    #[test]
    fn test_interrupted_stream_removes_partial_file() {
        let dir = tempdir().unwrap();
        let partial = dir.path().join("pose.safetensors.part");
        let err = write_stream(BrokenReader(64), &partial).unwrap_err();
        assert!(err.to_string().contains("Cannot write"));
        assert!(!partial.exists());
    }
}
