pub mod admin;
pub mod auth;
pub mod functions;
pub mod leads;
pub mod properties;
pub mod uploads;
pub mod users;
