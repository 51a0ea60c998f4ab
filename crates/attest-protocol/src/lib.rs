pub mod error;
pub mod message;
pub mod payload;
pub mod wire;

pub use error::CodecError;
pub use message::SignedMessage;
pub use payload::Payload;
pub use wire::Candidate;
