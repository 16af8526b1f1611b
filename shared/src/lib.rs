pub mod category;
pub mod chart;
pub mod damage;
pub mod format;

pub use category::DamageCategory;
pub use chart::{PieSlice, format_percentage, pie_slices};
pub use damage::*;
pub use format::format_count;
