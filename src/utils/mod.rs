pub mod constants;
pub mod url_utils;

pub use constants::*;
pub use url_utils::{extract_host, file_extension, host_dir_name, is_valid_url, page_id};
