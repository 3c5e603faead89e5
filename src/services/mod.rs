pub mod api;
pub mod credentials;
