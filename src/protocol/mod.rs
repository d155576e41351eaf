//! Wire protocol: line framing and the message envelope.

pub mod codec;
pub mod envelope;

pub use codec::{LineCodec, MAX_LINE_BYTES};
pub use envelope::{decode, Decoded, Envelope, InboundEnvelope};
