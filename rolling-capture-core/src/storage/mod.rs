pub mod file_sink;
pub mod metadata;
pub mod recording_store;
pub mod settings_store;
