//! Streaming byte transfer with fractional progress reporting.
//!
//! Both channel asset downloads and the self-update download go through
//! [`copy_with_progress`]: fixed-size chunks, each written to the sink
//! before the next read so buffering stays bounded, with a progress
//! callback invoked after every chunk.
//!
//! When the total size is known up front the callback additionally carries
//! a fraction clamped to `[0, 1]`, and a final report of exactly `1.0` is
//! guaranteed on success even when upstream transforms (compression,
//! transfer encodings) make the byte count drift from the advertised
//! total. Without a known total only the raw byte count is reported, and
//! callers must not render a determinate progress bar.
//!
//! The copy fails fast on the first read or write error and performs no
//! internal retry; retry policy belongs to the caller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::constants::COPY_CHUNK_SIZE;

/// A single progress report emitted after each chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Cumulative bytes written to the destination so far.
    pub bytes_copied: u64,
    /// Normalized completion in `[0, 1]`, present only when the total
    /// size was known when the copy started.
    pub fraction: Option<f64>,
}

impl Progress {
    fn new(bytes_copied: u64, known_total: Option<u64>) -> Self {
        let fraction = known_total.map(|total| {
            if total == 0 {
                1.0
            } else {
                (bytes_copied as f64 / total as f64).clamp(0.0, 1.0)
            }
        });
        Self {
            bytes_copied,
            fraction,
        }
    }

    fn finished(bytes_copied: u64, known_total: Option<u64>) -> Self {
        Self {
            bytes_copied,
            fraction: known_total.map(|_| 1.0),
        }
    }
}

/// Cancellation flag threaded through streaming copies.
///
/// Checked between chunks only; once the self-update transaction moves
/// past its download phase the flag is no longer consulted.
pub type CancelFlag = Arc<AtomicBool>;

fn is_cancelled(cancel: Option<&CancelFlag>) -> bool {
    cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
}

/// Stream `source` into `destination` in fixed-size chunks, reporting
/// progress after every chunk.
///
/// Returns the total number of bytes copied. Fails on the first I/O error
/// from either side, or with a cancellation error if `cancel` is raised
/// between chunks.
pub async fn copy_with_progress<R, W, F>(
    mut source: R,
    mut destination: W,
    known_total: Option<u64>,
    mut on_progress: F,
    cancel: Option<CancelFlag>,
) -> Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    F: FnMut(Progress),
{
    let mut buf = vec![0u8; COPY_CHUNK_SIZE];
    let mut copied: u64 = 0;

    loop {
        if is_cancelled(cancel.as_ref()) {
            bail!("transfer cancelled after {copied} bytes");
        }

        let n = source.read(&mut buf).await.context("Failed to read from source")?;
        if n == 0 {
            break;
        }

        destination.write_all(&buf[..n]).await.context("Failed to write to destination")?;
        copied += n as u64;
        on_progress(Progress::new(copied, known_total));
    }

    destination.flush().await.context("Failed to flush destination")?;
    on_progress(Progress::finished(copied, known_total));
    debug!("Copied {copied} bytes");
    Ok(copied)
}

/// Download `url` into `dest`, streaming the response body chunk by chunk
/// with the same progress semantics as [`copy_with_progress`].
///
/// The advertised total is taken from the release asset metadata when
/// available, falling back to the response's `Content-Length`. Returns
/// the number of bytes written.
pub async fn download_to_file<F>(
    client: &reqwest::Client,
    url: &str,
    dest: &std::path::Path,
    known_total: Option<u64>,
    mut on_progress: F,
    cancel: Option<CancelFlag>,
) -> Result<u64>
where
    F: FnMut(Progress),
{
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to request {url}"))?;

    if !response.status().is_success() {
        bail!("Download of {url} failed with status {}", response.status());
    }

    let total = known_total.or(response.content_length());
    let mut stream = response.bytes_stream();

    let mut file = tokio::fs::File::create(dest)
        .await
        .with_context(|| format!("Failed to create {}", dest.display()))?;

    let mut copied: u64 = 0;
    while let Some(chunk) = stream.next().await {
        if is_cancelled(cancel.as_ref()) {
            bail!("Download of {url} cancelled after {copied} bytes");
        }
        let chunk = chunk.with_context(|| format!("Failed while streaming {url}"))?;
        file.write_all(&chunk).await.context("Failed to write downloaded chunk")?;
        copied += chunk.len() as u64;
        on_progress(Progress::new(copied, total));
    }

    file.flush().await.context("Failed to flush download")?;
    on_progress(Progress::finished(copied, total));
    debug!("Downloaded {copied} bytes from {url}");
    Ok(copied)
}
