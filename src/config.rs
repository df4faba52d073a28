use clap::Parser;

/// Real-time chat and game-state relay
#[derive(Parser, Clone, Debug)]
#[command(name = "relayroom", version, about)]
pub struct Config {
    /// Address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, short, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Score the shared game state starts with
    #[arg(long, env = "INITIAL_SCORE", default_value_t = 1)]
    pub initial_score: i64,

    /// Refuse connections beyond this many clients
    #[arg(long, env = "MAX_CLIENTS")]
    pub max_clients: Option<usize>,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
