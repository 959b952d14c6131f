pub mod api;
pub mod auth;
pub mod booking;
pub mod credentials;
pub mod navigation;
