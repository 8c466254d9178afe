pub mod cache;
pub mod feed;
pub mod quality;
pub mod quota;
