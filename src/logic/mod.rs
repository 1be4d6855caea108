pub mod editor;
pub mod listing;
pub mod validate;

pub use editor::*;
pub use listing::*;
pub use validate::*;
