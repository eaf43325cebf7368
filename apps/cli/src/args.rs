use std::path::PathBuf;

use anyhow::bail;
use clap::{ArgAction, Parser};

/// Uploads files to a transfer share, or lists the files behind a share link.
///
/// Pass local files or directories to upload them into a new share, or a
/// single share URL to print each file's direct download link.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, disable_version_flag = true)]
pub struct Args {
    /// Files or directories to upload, or one share URL to list.
    #[arg(required = true, value_name = "PATH|URL")]
    pub inputs: Vec<String>,

    /// Cookie to send instead of the one captured from the server.
    #[arg(short, long)]
    pub cookie: Option<String>,

    /// Passcode bound to the new share, or needed to open an existing one.
    #[arg(short, long)]
    pub password: Option<String>,

    /// Log engine and client activity at debug level.
    #[arg(short, long)]
    pub verbose: bool,

    /// Verify every stored block against its MD5 digest.
    #[arg(short = 'V', long)]
    pub verify: bool,

    /// Per-call timeout in seconds.
    #[arg(short = 'T', long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Block size in bytes (larger values are clamped to 4 MiB).
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub block_size: Option<u64>,

    /// Concurrent block uploads (and link resolutions).
    #[arg(short = 'l', long, value_parser = clap::value_parser!(u32).range(1..))]
    pub parallel: Option<u32>,

    /// Retries per block after the first failed attempt.
    #[arg(short, long)]
    pub retry: Option<u32>,

    /// Configuration file (defaults to ~/.config/cowput/config.toml).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print version.
    #[arg(long, action = ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,
}

/// What the command line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Upload(Vec<PathBuf>),
    List(String),
}

impl Args {
    /// Decides between upload and listing mode.
    ///
    /// A lone URL lists a share; anything else must be local paths.
    pub fn mode(&self) -> anyhow::Result<Mode> {
        if let [only] = self.inputs.as_slice()
            && is_url(only)
        {
            return Ok(Mode::List(only.clone()));
        }

        if let Some(url) = self.inputs.iter().find(|i| is_url(i)) {
            bail!("upload supports local files only, got URL {url}");
        }
        Ok(Mode::Upload(self.inputs.iter().map(PathBuf::from).collect()))
    }
}

fn is_url(input: &str) -> bool {
    input.starts_with("https://") || input.starts_with("http://")
}
