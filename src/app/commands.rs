//! Inbound voice commands.
//!
//! The vocabulary is tiny: an active session maps a transcript to at most
//! one of these, and each one sets the armed flag.

/// Commands accepted while the voice session is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceCommand {
    /// "lock system": arm.
    Lock,
    /// "deactivate system": disarm.
    Deactivate,
}

impl VoiceCommand {
    pub const LOCK_PHRASE: &'static str = "lock system";
    pub const DEACTIVATE_PHRASE: &'static str = "deactivate system";

    /// Case-insensitive substring match.  `Deactivate` wins if both
    /// phrases appear.
    pub fn from_transcript(transcript: &str) -> Option<Self> {
        let text = transcript.to_lowercase();
        if text.contains(Self::DEACTIVATE_PHRASE) {
            Some(Self::Deactivate)
        } else if text.contains(Self::LOCK_PHRASE) {
            Some(Self::Lock)
        } else {
            None
        }
    }

    /// Value the armed flag takes after this command.
    pub fn armed(self) -> bool {
        matches!(self, Self::Lock)
    }
}
