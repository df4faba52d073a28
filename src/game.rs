use tokio::sync::Mutex;

use crate::{
    broadcast::broadcast,
    message::{GameState, Message},
    registry::ClientRegistry,
};

/// The one game state every connection observes.
///
/// Writes replace the whole value; there is no merging.
#[derive(Debug, Default)]
pub struct GameStateCell {
    inner: Mutex<GameState>,
}

impl GameStateCell {
    pub fn new(initial: GameState) -> Self {
        Self {
            inner: Mutex::new(initial),
        }
    }

    pub async fn get(&self) -> GameState {
        self.inner.lock().await.clone()
    }

    pub async fn set(&self, state: GameState) {
        *self.inner.lock().await = state;
    }

    /// Replace the value and queue it for every client in `registry`.
    ///
    /// The cell stays locked until the frame is queued, so broadcasts leave
    /// in the same order the writes landed and the last one every client
    /// sees is the value the cell holds. Returns the number of clients
    /// reached.
    pub async fn update(&self, state: GameState, registry: &ClientRegistry) -> usize {
        let mut current = self.inner.lock().await;
        *current = state;
        broadcast(registry, &Message::game_state(current.clone())).await
    }
}
