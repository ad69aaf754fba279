//! BIST Feed Adapter
//!
//! Ingestion pipeline for the line-oriented BIST feed:
//!
//! - **Transport**: raw TCP stream, chunks passed through unmodified
//! - **Listener**: session lifecycle and handshake
//! - **Framer**: chunk decoding and line framing with carry-over
//! - **Router**: type-code classification onto worker queues
//! - **Workers**: one ordered queue per message family
//! - **Decoders**: per-type validation and merge into the state store

pub mod decoders;
pub mod field_codes;
pub mod framer;
pub mod listener;
pub mod protocol;
pub mod router;
pub mod state;
pub mod transport;
pub mod workers;

pub use decoders::{DecodeError, Decoded, DecoderContext, decode};
pub use field_codes::{FIELD_CODES, FieldOutcome, apply_field_code, field_for_code};
pub use framer::{ChunkDecoder, FrameReader, FramingError};
pub use listener::SessionListener;
pub use protocol::{FeedLine, MessageType, QueueKind, UnknownReason};
pub use router::MessageRouter;
pub use state::{ConnectionState, FeedState, FeedStatus};
pub use transport::{ReceiveHandler, TcpTransport, TransportError};
pub use workers::{DecodeFn, WorkerPool};
