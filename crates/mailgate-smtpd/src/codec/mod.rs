//! Framing of the client byte stream.
//!
//! - [`FrameDecoder`]: splits input into command lines and DATA blocks
//! - [`MessageData`]: a finished DATA block, in memory or spilled to disk
//! - [`MessageReader`]: sequential reader over a [`MessageData`]

mod context;
mod decoder;
mod message;

pub(crate) use context::DecoderContext;
pub use decoder::{Frame, FrameDecoder};
pub use message::{MessageData, MessageReader};
