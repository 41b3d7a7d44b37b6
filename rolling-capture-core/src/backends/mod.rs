pub mod push_source;

#[cfg(feature = "cpal")]
pub mod cpal_source;
