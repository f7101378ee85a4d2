use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crossbeam_channel::bounded;
use image::RgbImage;

use crate::core::error::{Error, Result};

/// Upper bound on the acquisition phase. A fetch that has not produced a
/// decoded bitmap by then is terminal for that invocation; there is no retry.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Decodes a bitmap from disk, discarding any alpha channel.
pub fn load_bitmap(path: &Path) -> Result<RgbImage> {
    let reader = image::io::Reader::open(path)
        .map_err(|e| Error::Acquisition(format!("{}: {e}", path.display())))?;
    let decoded = reader
        .decode()
        .map_err(|e| Error::Acquisition(format!("{}: {e}", path.display())))?;
    Ok(decoded.to_rgb8())
}

/// Runs the load on a worker thread and waits at most `timeout` for the
/// decoded bitmap. On timeout the pipeline aborts before any world-thread
/// work is scheduled.
pub fn acquire(path: &Path, timeout: Duration) -> Result<RgbImage> {
    let (tx, rx) = bounded(1);
    let owned: PathBuf = path.to_path_buf();
    thread::spawn(move || {
        // The receiver may have timed out and gone away; nothing to do then.
        let _ = tx.send(load_bitmap(&owned));
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => Err(Error::Acquisition(format!(
            "timed out after {}s loading {}",
            timeout.as_secs(),
            path.display()
        ))),
    }
}
