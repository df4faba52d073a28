//! Real-time relay for chat messages and a single shared game state.
//!
//! Clients connect over WebSocket, receive the current game state, and from
//! then on every chat message or game-state update any of them sends is
//! relayed to all connected clients.

pub mod broadcast;
pub mod config;
pub mod error;
pub mod game;
pub mod handlers;
pub mod message;
pub mod registry;
pub mod server;
pub mod state;
