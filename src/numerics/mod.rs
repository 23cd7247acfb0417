pub mod cache;
pub mod factor;
pub mod sparse;
pub mod timing;
