//! Request handlers.

pub mod analysis;
pub mod cache;
pub mod chat;
pub mod costs;
pub mod health;
pub mod image;

pub use analysis::*;
pub use cache::*;
pub use chat::*;
pub use costs::*;
pub use health::*;
pub use image::*;
