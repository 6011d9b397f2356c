//! Command protocol: the JSON frames a remote operator sends to the agent.

pub mod codec;
pub mod commands;

pub use codec::{decode_command, encode_command, encode_reply, CommandError};
pub use commands::*;
