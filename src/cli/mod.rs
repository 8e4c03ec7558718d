pub mod commands;
pub mod ui;
pub mod util;

pub use ui::Output;
pub use util::{load_context, load_sources, write_output};
