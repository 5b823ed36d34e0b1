pub mod constants;
pub mod url_utils;

pub use constants::*;
pub use url_utils::{is_valid_base_url, path_extension, resolve_url, same_origin};
