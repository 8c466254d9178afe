pub mod boundaries;
pub mod errors;
pub mod gateways;
pub mod interactors;
pub mod models;
pub mod services;
pub mod settings;
pub mod utils;
