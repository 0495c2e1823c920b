use mc_snake_game::chaser::ChaserSettings;
use mc_snake_game::location::SearchSettings;
use mc_snake_game::movement::{FollowMode, MovementSettings};
use mc_snake_game::pathfinding::PathfinderConfig;
use mc_snake_game::GameSettings;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct SnakeConfig {
    #[serde(default)]
    pub game: GameSection,
    pub arena: ArenaSection,
    #[serde(default)]
    pub pathfinding: PathfindingSection,
    #[serde(default)]
    pub bots: BotsSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Deserialize)]
pub struct GameSection {
    /// Snake speed in blocks per second.
    #[serde(default = "default_snake_speed")]
    pub snake_speed: f32,
    /// Game ticks per second.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
    #[serde(default = "default_apple_count")]
    pub apple_count: usize,
    #[serde(default)]
    pub follow_mode: FollowModeSetting,
    #[serde(default)]
    pub chaser_enabled: bool,
    #[serde(default = "default_chaser_speed")]
    pub chaser_speed: f32,
}

fn default_snake_speed() -> f32 {
    5.0
}

fn default_tick_rate() -> u32 {
    10
}

fn default_apple_count() -> usize {
    1
}

fn default_chaser_speed() -> f32 {
    3.0
}

impl Default for GameSection {
    fn default() -> Self {
        Self {
            snake_speed: default_snake_speed(),
            tick_rate: default_tick_rate(),
            apple_count: default_apple_count(),
            follow_mode: FollowModeSetting::default(),
            chaser_enabled: false,
            chaser_speed: default_chaser_speed(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowModeSetting {
    #[default]
    Deferred,
    Immediate,
}

impl From<FollowModeSetting> for FollowMode {
    fn from(setting: FollowModeSetting) -> Self {
        match setting {
            FollowModeSetting::Deferred => FollowMode::Deferred,
            FollowModeSetting::Immediate => FollowMode::Immediate,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ArenaSection {
    #[serde(default = "default_region_name")]
    pub region: String,
    /// Corner `[x, y, z]`; `y` is the layer snakes move on.
    pub min: [i32; 3],
    pub max: [i32; 3],
    /// Y of the solid floor. Defaults to one below `min`.
    pub floor_y: Option<i32>,
    #[serde(default = "default_true")]
    pub walls: bool,
}

fn default_region_name() -> String {
    "arena".into()
}

fn default_true() -> bool {
    true
}

impl ArenaSection {
    pub fn floor_y(&self) -> i32 {
        self.floor_y.unwrap_or(self.min[1] - 1)
    }
}

#[derive(Debug, Deserialize)]
pub struct PathfindingSection {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_search_attempts")]
    pub search_attempts: u32,
}

fn default_max_iterations() -> usize {
    1000
}

fn default_search_attempts() -> u32 {
    200
}

impl Default for PathfindingSection {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            search_attempts: default_search_attempts(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BotsSection {
    #[serde(default = "default_bot_count")]
    pub count: u32,
    /// Stop after this many ticks. 0 = run until Ctrl+C.
    #[serde(default)]
    pub duration_ticks: u64,
}

fn default_bot_count() -> u32 {
    2
}

impl Default for BotsSection {
    fn default() -> Self {
        Self {
            count: default_bot_count(),
            duration_ticks: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    pub level: String,
}

impl SnakeConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Library settings for the game world.
    pub fn game_settings(&self) -> GameSettings {
        let ticks_per_second = self.game.tick_rate as f32;
        GameSettings {
            movement: MovementSettings {
                speed_blocks_per_second: self.game.snake_speed,
                ticks_per_second,
                follow_mode: self.game.follow_mode.into(),
                ..Default::default()
            },
            pathfinder: PathfinderConfig {
                max_iterations: self.pathfinding.max_iterations,
                ..Default::default()
            },
            search: SearchSettings {
                attempts: self.pathfinding.search_attempts,
                ..Default::default()
            },
            chaser: self.game.chaser_enabled.then(|| ChaserSettings {
                speed_blocks_per_second: self.game.chaser_speed,
                ticks_per_second,
                ..Default::default()
            }),
            apple_count: self.game.apple_count,
        }
    }
}
