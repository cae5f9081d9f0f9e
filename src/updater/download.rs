//! Cancellable, progress-reporting package download.

use anyhow::Result;
use futures::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::UpdaterError;
use crate::progress::{ProgressEvent, ProgressMeter};
use crate::utils::ensure_dir;

/// Stream the artifact at `url` to `destination`, emitting the same
/// progress-event shape as hashing.
///
/// Cancellation is observed between chunks: when `cancel` fires mid-transfer
/// the HTTP stream is dropped, the partial output file is removed, a
/// terminal error event is emitted and [`UpdaterError::Cancelled`] is
/// returned, never a completion event.
pub async fn download(
    http: &reqwest::Client,
    url: &str,
    destination: &Path,
    cancel: &CancellationToken,
    events: mpsc::UnboundedSender<ProgressEvent>,
) -> Result<()> {
    let response = match http.get(url).send().await {
        Ok(response) => response,
        Err(err) => {
            let _ = events.send(ProgressEvent::failed(
                url,
                Some(destination.to_path_buf()),
                err.to_string(),
            ));
            return Err(UpdaterError::network("package download", err).into());
        }
    };

    if !response.status().is_success() {
        let err = UpdaterError::HttpStatus { status: response.status(), url: url.to_string() };
        let _ = events.send(ProgressEvent::failed(url, Some(destination.to_path_buf()), err.to_string()));
        return Err(err.into());
    }

    let total = response.content_length();
    debug!("downloading {url} ({total:?} bytes) to {}", destination.display());

    if let Some(parent) = destination.parent() {
        ensure_dir(parent)?;
    }
    let mut file = tokio::fs::File::create(destination)
        .await
        .map_err(|e| UpdaterError::fs("create download output", destination, e))?;

    let mut stream = response.bytes_stream();
    let mut meter = ProgressMeter::new(total);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                drop(file);
                tokio::fs::remove_file(destination).await.ok();
                let _ = events.send(ProgressEvent::failed(
                    url,
                    Some(destination.to_path_buf()),
                    "download cancelled",
                ));
                return Err(UpdaterError::Cancelled { url: url.to_string() }.into());
            }
            chunk = stream.next() => match chunk {
                Some(Ok(bytes)) => {
                    file.write_all(&bytes)
                        .await
                        .map_err(|e| UpdaterError::fs("write download output", destination, e))?;
                    if let Some(snapshot) = meter.record(bytes.len() as u64) {
                        let _ = events.send(ProgressEvent::progress(
                            url,
                            Some(destination.to_path_buf()),
                            snapshot.mbps,
                            snapshot.eta_seconds,
                            snapshot.percent,
                        ));
                    }
                }
                Some(Err(err)) => {
                    let _ = events.send(ProgressEvent::failed(
                        url,
                        Some(destination.to_path_buf()),
                        err.to_string(),
                    ));
                    return Err(UpdaterError::network("package download", err).into());
                }
                None => break,
            }
        }
    }

    file.flush().await.map_err(|e| UpdaterError::fs("flush download output", destination, e))?;
    info!("downloaded {} bytes from {url}", meter.transferred());

    let _ = events.send(ProgressEvent::completed(url, Some(destination.to_path_buf()), None));
    Ok(())
}
