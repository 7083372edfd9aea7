//! Wire protocol subsystem.
//!
//! # Wire Format
//! ```text
//! ┌──────────────────┬──────────────────────────┐
//! │ length (u16, BE) │ payload (length bytes)   │
//! └──────────────────┴──────────────────────────┘
//! ```
//!
//! No message type, no checksum, no compression. Payload interpretation
//! belongs to the agent consuming the frames.
//!
//! # Data Flow
//! ```text
//! socket read half
//!     → decoder.rs (header, payload, idle deadline)
//!     → frame.rs (owned Frame)
//!     → backpressure queue → agent
//! ```

pub mod decoder;
pub mod frame;

pub use decoder::{DecodeError, FrameDecoder};
pub use frame::{encode_frame, Frame, FrameError, HEADER_SIZE, MAX_PAYLOAD_SIZE};
