pub mod config;
pub mod enrich;
pub mod error;
pub mod fpl_feed;
pub mod html;
pub mod http_cache;
pub mod http_client;
pub mod league_strength;
pub mod optimizer;
pub mod player;
pub mod points;
pub mod report;
pub mod squad;
pub mod stats_cache;
pub mod stats_provider;

pub use error::OptimizeError;
pub use optimizer::optimize;
pub use player::{Player, Position};
pub use squad::{SolveStatus, Squad, SquadConstraints};
