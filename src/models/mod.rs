pub mod booking;
pub mod catalog;
pub mod user;

pub use booking::{BookingForm, BookingRequest, Field, FieldErrors, ServiceRequestPayload};
pub use catalog::CatalogService;
pub use user::{AuthResponse, LoginRequest, RegisterRequest, Role, User};
