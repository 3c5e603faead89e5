pub mod auth;
pub mod session;
pub mod testimonial;
pub mod wire;
