pub mod authorization;
pub mod likes;
pub mod monetization;
pub mod playback;
pub mod prefetcher;
pub mod resolver;
