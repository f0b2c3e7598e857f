//! Command session wire protocol.
//!
//! One frame per request or response:
//!
//! ```text
//! <decimal-byte-length>#<indicator-byte><payload>
//! ```
//!
//! where `length` counts indicator + payload bytes. Outbound frames append a
//! trailing newline that is not counted; the decoder skips newlines between
//! frames. The payload is opaque UTF-8 text whose meaning depends on the
//! indicator byte.

mod frame;

pub use frame::{Codec, Frame};
