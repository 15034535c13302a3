pub mod load;
pub mod save;
pub mod types;

pub use types::{
    Config, EncoderSettings, FileTypeTable, Language, MAX_RECENT_PATHS, SplitterSettings,
    UserSettings,
};
