mod utils;

pub use utils::{char_width, display_width, sanitize, split_at_width};
