use crate::error::CodecError;

/// Version tag leading every canonical payload.
pub const PAYLOAD_VERSION: &str = "v1";

/// The signable record: a capture-time timestamp plus the user's text.
///
/// Canonical encoding is `"v1 <unix-ms> <text>"` with single-space delimiters;
/// the text is the unescaped tail, so it may itself contain spaces. The
/// encoded bytes are what gets signed and transmitted. The receiving side
/// verifies those exact bytes and only decodes this structure for display,
/// never reconstructing the timestamp from its own clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub timestamp_ms: i64,
    pub text: String,
}

impl Payload {
    /// Build a payload for `text`, capturing the timestamp now.
    pub fn new(text: &str) -> Self {
        Self {
            timestamp_ms: timestamp_now_ms(),
            text: text.to_string(),
        }
    }

    /// Build a payload from explicit parts (tests, replays).
    pub fn from_parts(timestamp_ms: i64, text: &str) -> Self {
        Self {
            timestamp_ms,
            text: text.to_string(),
        }
    }

    /// Canonical byte encoding. Deterministic for identical parts.
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("{PAYLOAD_VERSION} {} {}", self.timestamp_ms, self.text).into_bytes()
    }

    /// Parse canonical payload bytes back into their parts.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let s = std::str::from_utf8(bytes)
            .map_err(|e| CodecError::MalformedPayload(format!("not UTF-8: {e}")))?;

        let mut parts = s.splitn(3, ' ');
        let version = parts.next().unwrap_or_default();
        if version != PAYLOAD_VERSION {
            return Err(CodecError::MalformedPayload(format!(
                "unknown version tag {version:?}"
            )));
        }
        let ts = parts
            .next()
            .ok_or_else(|| CodecError::MalformedPayload("missing timestamp".into()))?;
        let timestamp_ms = ts
            .parse()
            .map_err(|_| CodecError::MalformedPayload(format!("bad timestamp {ts:?}")))?;
        let text = parts.next().unwrap_or_default().to_string();

        Ok(Self { timestamp_ms, text })
    }
}

/// Current UNIX timestamp in milliseconds.
fn timestamp_now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(i64::MAX)
}
