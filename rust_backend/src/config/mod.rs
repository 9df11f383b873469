pub mod resolver;
pub mod settings;

pub use resolver::{resolve, resolve_into};
pub use settings::{
    CleaningSettings, EstimationSettings, FeatureSettings, OrchestrationSettings,
    SummarySettings,
};
