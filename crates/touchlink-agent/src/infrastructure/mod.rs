//! Infrastructure layer for the agent.
//!
//! Contains the outward-facing adapters: host capability implementations,
//! configuration persistence, and the network command channel.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `touchlink_core`, but MUST NOT be imported by the `application` layer
//! outside of tests.
//!
//! # Sub-modules
//!
//! - **`host`** – Implementations of `StrokeExecutor`, `TextFieldAccessor`
//!   and `ClipboardAccessor`.  The in-memory versions record every call.
//!
//! - **`storage`** – TOML configuration with defaults for every field.
//!
//! - **`network`** – WebSocket server that decodes JSON command frames and
//!   feeds them to the command router.

pub mod host;
pub mod network;
pub mod storage;
