pub mod path;
pub mod time;

pub use path::{ensure_dir, ensure_dir_mode, expand_tilde};
pub use time::{local_tz_offset_secs, mtime_to_utc, parse_runtime_time};
