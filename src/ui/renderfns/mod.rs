pub mod footer;
pub mod header;
pub mod utils;

pub use footer::draw_footer;
pub use header::{draw_header, HeaderContext};
pub use utils::{input_spans, notification_style, status_suffix, truncate};
