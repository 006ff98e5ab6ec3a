mod defaults;
mod types;

pub use defaults::{DefaultsProvider, VersionedDefaults};
pub use types::{BootstrapDefaults, CrmConfig, FeaturesConfig};
