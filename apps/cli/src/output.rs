//! Terminal output: progress logging and result records.

use std::io::{self, Write};

use cowput_engine::FileInfo;
use cowput_protocol::TransferSession;
use cowput_transfer::{FileProgress, ProgressHook};
use tracing::{debug, info, warn};

/// Renders upload progress through `tracing` on stderr.
///
/// Per-block lines are debug level, so only `--verbose` shows them.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressHook for LogProgress {
    fn session_opened(&self, session: &TransferSession) {
        info!(link = %session.unique_url, "share created");
    }

    fn session_finished(&self, session: &TransferSession) {
        info!(
            link = %session.unique_url,
            code = session.temp_code.as_deref().unwrap_or(""),
            "share finished"
        );
    }

    fn transfer_init(&self, progress: &FileProgress) {
        info!(
            path = %progress.path.display(),
            bytes = progress.file_size,
            blocks = progress.total_blocks,
            "uploading"
        );
    }

    fn block_done(&self, progress: &FileProgress) {
        debug!(
            path = %progress.path.display(),
            block = progress.block.map(|b| b.index),
            done = progress.done_blocks,
            total = progress.total_blocks,
            percent = format_args!("{:.1}", progress.fraction() * 100.0),
            "block stored"
        );
    }

    fn block_retry(&self, progress: &FileProgress) {
        if let Some(retry) = &progress.retry {
            warn!(
                path = %progress.path.display(),
                block = progress.block.map(|b| b.index),
                retries_left = retry.retries_left,
                error = %retry.error,
                "block retry"
            );
        }
    }

    fn file_finished(&self, progress: &FileProgress) {
        info!(path = %progress.path.display(), bytes = progress.file_size, "uploaded");
    }
}

/// Writes one record per resolved file.
pub fn write_listing(out: &mut impl Write, files: &[FileInfo]) -> io::Result<()> {
    for (idx, file) in files.iter().enumerate() {
        writeln!(out, "idx:  {idx}")?;
        writeln!(out, "file: {}", file.name)?;
        writeln!(out, "url:  {}", file.url)?;
        writeln!(out, "size: {}", file.size)?;
        if let Some(error) = &file.error {
            writeln!(out, "err:  {error}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn write_link(out: &mut impl Write, link: &str) -> io::Result<()> {
    writeln!(out, "link: {link}")
}
