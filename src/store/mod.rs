pub mod meta_store;
pub mod selection_store;
pub mod settings_store;

pub use meta_store::MetaStore;
pub use selection_store::SelectionStore;
pub use settings_store::{SettingsStore, UpstreamSettings};
