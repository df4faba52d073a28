use crate::{
    config::Config, game::GameStateCell, message::GameState,
    registry::ClientRegistry,
};

pub struct AppState {
    pub registry: ClientRegistry,
    pub game_state: GameStateCell,
}

impl AppState {
    pub fn new(registry: ClientRegistry, initial: GameState) -> Self {
        Self {
            registry,
            game_state: GameStateCell::new(initial),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let registry = match config.max_clients {
            Some(limit) => ClientRegistry::with_capacity(limit),
            None => ClientRegistry::new(),
        };
        Self::new(registry, GameState::new(config.initial_score))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ClientRegistry::new(), GameState::default())
    }
}
