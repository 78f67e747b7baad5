use thiserror::Error;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("region not found: {0}")]
    RegionNotFound(String),

    #[error("area {index} is not loaded in region {region}")]
    AreaNotLoaded { region: String, index: usize },

    #[error("player not found: {0:?}")]
    PlayerNotFound(crate::core::types::PlayerId),

    #[error(
        "no valid position in region {region} area {index} after {attempts} attempts \
         (exclusion zones leave no free interior)"
    )]
    NoValidPosition {
        region: String,
        index: usize,
        attempts: u32,
    },

    #[error("invalid world data: {0}")]
    InvalidWorld(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, GameError>;
