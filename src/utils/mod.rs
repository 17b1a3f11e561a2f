pub mod i18n;
pub mod phone;
pub mod token;
