pub mod clock;
pub mod http;
pub mod simulated;
pub mod stores;
