// FILE: src/core/mod.rs
pub mod category;
pub mod classifier;
pub mod in_flight;
pub mod thumbnails;

pub use category::Category;
pub use classifier::classify;
pub use in_flight::{InFlightGuard, InFlightTracker};
pub use thumbnails::{thumbnail_key, Derivation, ThumbnailCoordinator};
