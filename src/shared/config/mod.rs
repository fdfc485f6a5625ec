mod global;
pub mod model;

pub use global::CONFIG;
pub use model::{
    DataQualityPolicy, EngineConfig, FetchConfig, LoggingConfig, PipelineJobConfig, Settings,
    load_settings, load_settings_from,
};
