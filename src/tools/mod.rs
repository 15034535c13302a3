mod ffprobe_info;
mod path_validator;
mod video_scanner;

pub use ffprobe_info::probe_duration;
pub use path_validator::{ensure_directory_exists, validate_directory_exists};
pub use video_scanner::{SourceFile, exclude_directory, scan_video_files};
