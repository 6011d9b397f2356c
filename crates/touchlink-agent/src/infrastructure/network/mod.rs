//! Network front-end: the WebSocket command channel.

pub mod ws_server;
