pub mod format;
pub mod paths;

pub use format::{format_duration, format_file_size, format_rate};
pub use paths::confine_path;
