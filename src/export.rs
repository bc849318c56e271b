// src/export.rs

//! Render-and-save on a worker thread, polled from the UI.

use crate::chain::ChainState;
use crate::host::AudioBuffer;
use crate::{offline, wav};
use anyhow::Context;
use chrono::Local;
use directories::UserDirs;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

/// `FX_Render_<unix millis>.wav`
pub fn render_file_name(unix_millis: i64) -> String {
    format!("FX_Render_{}.wav", unix_millis)
}

/// The user's download folder, or the working directory if there is none.
pub fn default_export_dir() -> PathBuf {
    UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Renders, encodes and writes synchronously. The file appears only once it
/// is complete; on failure nothing is left behind.
pub fn export_to(dir: &Path, chain: &ChainState, source: Arc<AudioBuffer>) -> anyhow::Result<PathBuf> {
    let rendered = offline::render(chain, source).context("offline render failed")?;
    let bytes = wav::encode(&rendered);

    fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    let path = dir.join(render_file_name(Local::now().timestamp_millis()));
    let partial = path.with_extension("wav.part");
    if let Err(e) = fs::write(&partial, &bytes).and_then(|_| fs::rename(&partial, &path)) {
        let _ = fs::remove_file(&partial);
        return Err(e).with_context(|| format!("cannot write {}", path.display()));
    }
    Ok(path)
}

pub enum ExportStatus {
    Running,
    Finished(PathBuf),
    Failed(String),
}

/// One export in flight. The chain is snapshotted when the job starts, so
/// later edits do not leak into the render.
pub struct ExportJob {
    receiver: Receiver<anyhow::Result<PathBuf>>,
    done: bool,
}

impl ExportJob {
    pub fn spawn(chain: ChainState, source: Arc<AudioBuffer>, dir: PathBuf) -> Self {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let result = export_to(&dir, &chain, source);
            match &result {
                Ok(path) => tracing::info!(path = %path.display(), "export finished"),
                Err(e) => tracing::error!("export failed: {:#}", e),
            }
            let _ = sender.send(result);
        });
        Self {
            receiver,
            done: false,
        }
    }

    pub fn poll(&mut self) -> ExportStatus {
        if self.done {
            return ExportStatus::Failed("export already collected".to_string());
        }
        match self.receiver.try_recv() {
            Ok(Ok(path)) => {
                self.done = true;
                ExportStatus::Finished(path)
            }
            Ok(Err(e)) => {
                self.done = true;
                ExportStatus::Failed(format!("{:#}", e))
            }
            Err(TryRecvError::Empty) => ExportStatus::Running,
            Err(TryRecvError::Disconnected) => {
                self.done = true;
                ExportStatus::Failed("export worker stopped unexpectedly".to_string())
            }
        }
    }

    /// Blocks until the worker reports back.
    pub fn wait(self) -> anyhow::Result<PathBuf> {
        self.receiver
            .recv()
            .context("export worker stopped unexpectedly")?
    }
}
