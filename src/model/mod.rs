mod catalog;
mod types;

pub use catalog::ModelCatalog;
pub use types::{ModelInfo, ModelList, VersionInfo};
