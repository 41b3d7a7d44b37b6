pub mod buffer_delegate;
pub mod capture_source;
pub mod file_sink;
