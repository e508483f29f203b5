// Endpoint handler groups

mod account;
mod auth;

pub use account::AccountApi;
pub use auth::AuthApi;
