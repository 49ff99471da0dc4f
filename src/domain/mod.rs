pub mod models;
pub mod motion;
pub mod settings;
