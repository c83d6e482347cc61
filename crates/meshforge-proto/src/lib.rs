//! Meshforge message types.
//!
//! The fabric routes [`Message`] values between logical nodes. Apart from the
//! recipient and the payload (which fault injection may corrupt), the
//! transport treats messages as opaque; their meaning belongs to whichever
//! consensus protocol is running on top.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod message;

pub use message::{InvalidMessageType, Message, MessageType, NodeId};
