//! Audio adapter: fetch a clip over HTTP and play it with an external player.
//!
//! The clip is downloaded with `ureq`, written to a scratch file and handed
//! to `ffplay -nodisp -autoexit`, which decodes whatever container the URL
//! serves (the cues are M4A).

use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use log::debug;

use super::utils::{http_agent, http_error};
use crate::app::ports::AudioPlayer;
use crate::error::CollaboratorError;

/// Largest clip accepted.
const MAX_CLIP_BYTES: u64 = 8 * 1024 * 1024;

pub struct UrlAudioPlayer {
    player: String,
    agent: ureq::Agent,
    scratch_seq: AtomicU32,
}

impl UrlAudioPlayer {
    pub fn new(player: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            agent: http_agent(Duration::from_secs(5), Duration::from_secs(30)),
            scratch_seq: AtomicU32::new(0),
        }
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, CollaboratorError> {
        let response = self.agent.get(url).call().map_err(http_error)?;
        let mut clip = Vec::new();
        response
            .into_reader()
            .take(MAX_CLIP_BYTES)
            .read_to_end(&mut clip)
            .map_err(|e| CollaboratorError::Transport(e.to_string()))?;
        if clip.is_empty() {
            return Err(CollaboratorError::Decode("empty clip".into()));
        }
        Ok(clip)
    }

    fn scratch_path(&self) -> PathBuf {
        let n = self.scratch_seq.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("homeguard-clip-{}-{n}", std::process::id()))
    }
}

impl AudioPlayer for UrlAudioPlayer {
    fn play_url(&self, url: &str) -> Result<(), CollaboratorError> {
        let clip = self.fetch(url)?;
        let path = self.scratch_path();
        std::fs::write(&path, &clip)
            .map_err(|e| CollaboratorError::Process(format!("scratch file: {e}")))?;
        debug!("AUDIO: playing {} bytes from {}", clip.len(), url);

        let status = Command::new(&self.player)
            .args(["-nodisp", "-autoexit", "-loglevel", "error"])
            .arg(&path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        let _ = std::fs::remove_file(&path);

        let status = status.map_err(|e| CollaboratorError::Process(format!("{}: {e}", self.player)))?;
        if !status.success() {
            return Err(CollaboratorError::Decode(format!(
                "{} exited with {status}",
                self.player
            )));
        }
        Ok(())
    }
}
