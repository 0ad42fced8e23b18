use std::fs::File;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::cluster::ClusterClient;
use crate::error::{BackupError, Result};

const BAR_TEMPLATE: &str = "{bytes}/{total_bytes} [{wide_bar}] {bytes_per_sec}, eta {eta}";

pub fn transfer_bar(size: u64) -> Result<ProgressBar> {
    let style = ProgressStyle::with_template(BAR_TEMPLATE)
        .map_err(|e| BackupError::message(format!("progress bar template: {}", e)))?
        .progress_chars("=> ");
    Ok(ProgressBar::new(size).with_style(style))
}

/// Uploads a local disk image (ISO, qcow2, ...) to the cluster's media
/// library. Returns the uuid the cluster assigned to it.
pub fn upload_disk_media(cluster: &dyn ClusterClient, path: &Path) -> Result<String> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| BackupError::message(format!("{} does not name a file", path.display())))?;
    let file = File::open(path)
        .map_err(|e| BackupError::message(format!("Failed to open file {}: {}", path.display(), e)))?;
    let meta = file
        .metadata()
        .map_err(|e| BackupError::message(format!("Failed to get file info for {}: {}", path.display(), e)))?;
    if !meta.is_file() {
        return Err(BackupError::message(format!("{} is not a regular file", path.display())));
    }
    let size = meta.len();

    let bar = transfer_bar(size)?;
    let uuid = match cluster.upload_disk(&name, size, Box::new(bar.wrap_read(file))) {
        Ok(uuid) => uuid,
        Err(err) => {
            bar.abandon();
            return Err(BackupError::message(format!("Failed to upload {}: {}", path.display(), err)));
        }
    };
    bar.finish();
    println!("Uploaded {} as {}", name, uuid);
    info!(file = %name, uuid = %uuid, size, "disk media uploaded");
    Ok(uuid)
}
