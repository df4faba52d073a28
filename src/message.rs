//! Wire schema shared with the browser client.
//!
//! Every frame is a JSON object tagged by `type`. Unknown fields are ignored so
//! newer clients can talk to older servers.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Number;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::DecodeError;

/// Identifies one connection for as long as it stays open.
#[derive(
    Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct ClientId(Uuid);

impl ClientId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GameState {
    #[ts(type = "number")]
    pub score: Number,
}

impl GameState {
    pub fn new(score: impl Into<Number>) -> Self {
        Self {
            score: score.into(),
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(1)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type")]
#[ts(export)]
pub enum Message {
    #[serde(rename = "chat")]
    Chat {
        #[serde(default)]
        message: String,
        #[serde(
            rename = "senderId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        sender_id: Option<ClientId>,
        #[serde(
            rename = "userAgent",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        user_agent: Option<String>,
    },

    #[serde(rename = "game-state")]
    GameState {
        #[serde(rename = "gameState")]
        game_state: GameState,
    },
}

impl Message {
    /// A chat frame as a client would send it, with no sender stamp.
    pub fn chat(text: impl Into<String>) -> Self {
        Message::Chat {
            message: text.into(),
            sender_id: None,
            user_agent: None,
        }
    }

    pub fn game_state(game_state: GameState) -> Self {
        Message::GameState { game_state }
    }

    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(frame)?)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
