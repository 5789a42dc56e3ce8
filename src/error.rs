//! Unified error types for the HomeGuard coordinator.
//!
//! Each subsystem has its own small error enum.  Only setup failures
//! (configuration, GPIO export) reach the top-level [`Error`]; nothing
//! raised inside a task loop escapes it.  Link faults end in a reconnect,
//! payload faults in a discard, and collaborator faults in a log line.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The motion sensor line could not be configured.
    Sensor(SensorError),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// BLE link errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Opening the connection to the peer failed.
    ConnectFailed(String),
    /// The peer does not expose the expected service.
    ServiceNotFound,
    /// The service does not expose the expected characteristic.
    CharacteristicNotFound,
    /// A characteristic write was rejected or not acknowledged.
    WriteFailed(String),
    /// A write was attempted on a session that is not connected.
    NotConnected,
    /// The peer did not answer within the request timeout.
    Timeout,
    /// The helper process or its pipes failed.
    Io(String),
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed(why) => write!(f, "connect failed: {why}"),
            Self::ServiceNotFound => write!(f, "service not found"),
            Self::CharacteristicNotFound => write!(f, "characteristic not found"),
            Self::WriteFailed(why) => write!(f, "write failed: {why}"),
            Self::NotConnected => write!(f, "not connected"),
            Self::Timeout => write!(f, "request timed out"),
            Self::Io(why) => write!(f, "I/O error: {why}"),
        }
    }
}

impl std::error::Error for LinkError {}


// ---------------------------------------------------------------------------
// Notification payload errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadError {
    /// Payload bytes are not UTF-8.
    InvalidUtf8,
    /// Payload does not have exactly two comma-separated fields.
    WrongArity(usize),
    /// A field is not an integer.
    NotInteger,
    /// A field is an integer other than 0 or 1.
    OutOfRange(i64),
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUtf8 => write!(f, "payload is not UTF-8"),
            Self::WrongArity(n) => write!(f, "expected 2 fields, got {n}"),
            Self::NotInteger => write!(f, "field is not an integer"),
            Self::OutOfRange(v) => write!(f, "field value {v} is not 0 or 1"),
        }
    }
}

impl std::error::Error for PayloadError {}


// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    /// Exporting or configuring the GPIO line failed.
    SetupFailed(String),
    /// Reading the line value failed.
    ReadFailed(String),
    /// The line reported something other than `0` or `1`.
    BadLevel,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetupFailed(why) => write!(f, "GPIO setup failed: {why}"),
            Self::ReadFailed(why) => write!(f, "GPIO read failed: {why}"),
            Self::BadLevel => write!(f, "GPIO returned an invalid level"),
        }
    }
}

impl std::error::Error for SensorError {}

impl embedded_hal::digital::Error for SensorError {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Collaborator errors (audio, video, transcription, SMS, call)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// A remote resource answered with a non-200 status.
    FetchStatus(u16),
    /// The HTTP request could not be completed.
    Transport(String),
    /// Audio could not be decoded or played.
    Decode(String),
    /// An external program could not be started or failed.
    Process(String),
    /// The capture was recorded but the container conversion failed.
    Conversion(String),
    /// A notification API rejected the request.
    Api(String),
    /// The collaborator is not configured (missing credentials, etc.).
    NotConfigured(&'static str),
}

impl fmt::Display for CollaboratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchStatus(code) => write!(f, "fetch failed with status {code}"),
            Self::Transport(why) => write!(f, "transport error: {why}"),
            Self::Decode(why) => write!(f, "decode failed: {why}"),
            Self::Process(why) => write!(f, "process failed: {why}"),
            Self::Conversion(why) => write!(f, "conversion failed: {why}"),
            Self::Api(why) => write!(f, "API error: {why}"),
            Self::NotConfigured(what) => write!(f, "not configured: {what}"),
        }
    }
}

impl std::error::Error for CollaboratorError {}


// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, Error>;
