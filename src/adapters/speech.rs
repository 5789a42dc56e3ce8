//! Speech-to-text adapter: `arecord` capture, RMS speech gate, HTTP upload.
//!
//! One [`Transcriber::listen`] call:
//!
//! 1. streams 16-bit mono PCM from `arecord` in 100 ms chunks;
//! 2. gives up with [`ListenOutcome::NoSpeech`] if no chunk rises above the
//!    silence floor before the listen timeout;
//! 3. keeps capturing until the phrase limit or ~0.8 s of trailing silence;
//! 4. encodes the clip as WAV and POSTs it to the transcription
//!    endpoint, which answers `{"text": "..."}`.

use std::io::{Cursor, Read};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use hound::{SampleFormat, WavSpec, WavWriter};
use log::{debug, warn};
use serde::Deserialize;

use super::utils::http_agent;
use crate::app::ports::{ListenOutcome, Transcriber};
use crate::config::SpeechConfig;
use crate::error::CollaboratorError;

const CHUNK_MS: u32 = 100;
/// Silent chunks after speech that end the phrase.
const TRAILING_SILENCE_CHUNKS: u32 = 8;
/// Calibrated floor sits this far above the measured ambient level.
const AMBIENT_MARGIN: f32 = 1.5;

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    #[serde(default)]
    text: String,
}

/// Root-mean-square level of a block of samples.
pub fn rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let energy = samples
        .iter()
        .map(|s| f32::from(*s).powi(2))
        .sum::<f32>()
        / samples.len() as f32;
    energy.sqrt()
}

/// Mono 16-bit PCM WAV image of `samples`.
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, CollaboratorError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let encode_err = |e: hound::Error| CollaboratorError::Decode(format!("WAV encode: {e}"));

    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    let mut writer = WavWriter::new(&mut cursor, spec).map_err(encode_err)?;
    for &sample in samples {
        writer.write_sample(sample).map_err(encode_err)?;
    }
    writer.finalize().map_err(encode_err)?;
    Ok(cursor.into_inner())
}

pub struct HttpTranscriber {
    recorder: String,
    config: SpeechConfig,
    agent: ureq::Agent,
    floor: f32,
}

impl HttpTranscriber {
    pub fn new(recorder: impl Into<String>, config: SpeechConfig) -> Self {
        let floor = config.silence_rms;
        Self {
            recorder: recorder.into(),
            config,
            agent: http_agent(Duration::from_secs(5), Duration::from_secs(30)),
            floor,
        }
    }

    fn chunk_samples(&self) -> usize {
        (self.config.sample_rate * CHUNK_MS / 1000) as usize
    }

    fn start_capture(&self, limit: Duration) -> Result<Child, CollaboratorError> {
        let secs = limit.as_secs().max(1);
        Command::new(&self.recorder)
            .args(["-q", "-f", "S16_LE", "-c", "1", "-t", "raw"])
            .args(["-r", &self.config.sample_rate.to_string()])
            .args(["-d", &secs.to_string()])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CollaboratorError::Process(format!("{}: {e}", self.recorder)))
    }

    /// Read the next chunk; `None` at end of stream.
    fn read_chunk(&self, child: &mut Child) -> Option<Vec<i16>> {
        let stdout = child.stdout.as_mut()?;
        let mut buf = vec![0u8; self.chunk_samples() * 2];
        stdout.read_exact(&mut buf).ok()?;
        Some(
            buf.chunks_exact(2)
                .map(|b| i16::from_le_bytes([b[0], b[1]]))
                .collect(),
        )
    }

    /// Capture one phrase.  `Ok(None)` means nobody spoke in time.
    fn capture_phrase(
        &self,
        timeout: Duration,
        phrase_limit: Duration,
    ) -> Result<Option<Vec<i16>>, CollaboratorError> {
        let mut child = self.start_capture(phrase_limit)?;
        let wait_chunks = (timeout.as_millis() as u32 / CHUNK_MS).max(1);
        let limit_chunks = (phrase_limit.as_millis() as u32 / CHUNK_MS).max(wait_chunks);

        let mut clip = Vec::new();
        let mut heard = false;
        let mut quiet_run = 0;
        for n in 0..limit_chunks {
            let Some(chunk) = self.read_chunk(&mut child) else {
                break;
            };
            let loud = rms(&chunk) >= self.floor;
            if loud {
                heard = true;
                quiet_run = 0;
            } else if heard {
                quiet_run += 1;
            }
            clip.extend_from_slice(&chunk);
            if !heard && n + 1 >= wait_chunks {
                break;
            }
            if heard && quiet_run >= TRAILING_SILENCE_CHUNKS {
                break;
            }
        }
        let _ = child.kill();
        let _ = child.wait();

        Ok(heard.then_some(clip))
    }

    fn transcribe(&self, clip: &[i16]) -> Result<String, CollaboratorError> {
        let wav = encode_wav(clip, self.config.sample_rate)?;
        let response = self
            .agent
            .post(&self.config.endpoint)
            .set("Content-Type", "audio/wav")
            .send_bytes(&wav);
        match response {
            Ok(resp) => {
                let body: TranscriptResponse = resp
                    .into_json()
                    .map_err(|e| CollaboratorError::Api(format!("bad response: {e}")))?;
                Ok(body.text)
            }
            Err(ureq::Error::Status(code, _)) => Err(CollaboratorError::FetchStatus(code)),
            Err(ureq::Error::Transport(t)) => Err(CollaboratorError::Transport(t.to_string())),
        }
    }
}

impl Transcriber for HttpTranscriber {
    fn calibrate(&mut self) -> Result<(), CollaboratorError> {
        let mut child = self.start_capture(Duration::from_secs(1))?;
        let mut ambient = Vec::new();
        while let Some(chunk) = self.read_chunk(&mut child) {
            ambient.extend_from_slice(&chunk);
        }
        let _ = child.wait();
        let level = rms(&ambient);
        self.floor = self.config.silence_rms.max(level * AMBIENT_MARGIN);
        debug!("VOICE: ambient rms={:.1}, floor={:.1}", level, self.floor);
        Ok(())
    }

    fn listen(&mut self, timeout: Duration, phrase_limit: Duration) -> ListenOutcome {
        let clip = match self.capture_phrase(timeout, phrase_limit) {
            Ok(Some(clip)) => clip,
            Ok(None) => return ListenOutcome::NoSpeech,
            Err(e) => {
                // Microphone faults count against the session like garbled speech.
                warn!("VOICE: capture failed: {}", e);
                return ListenOutcome::Unintelligible;
            }
        };
        match self.transcribe(&clip) {
            Ok(text) if text.trim().is_empty() => ListenOutcome::Unintelligible,
            Ok(text) => ListenOutcome::Text(text.trim().to_owned()),
            Err(e) => ListenOutcome::ServiceError(e.to_string()),
        }
    }
}
