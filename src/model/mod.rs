pub mod common;
pub mod destination;
pub mod formatting;
pub mod offer;
pub mod resource;
pub mod trip;
pub mod user_context;

pub use common::*;
pub use destination::*;
pub use formatting::*;
pub use offer::*;
pub use resource::*;
pub use trip::*;
pub use user_context::*;
