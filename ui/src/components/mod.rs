pub mod describe;
mod render_table;
pub mod summary;
mod text;

pub use render_table::render_table;
pub use text::Text;
