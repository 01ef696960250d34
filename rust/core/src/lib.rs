pub mod auth;
pub mod backend;
pub mod payment;
pub mod prelude;
pub mod records;
pub mod settings;
pub mod sync;
pub mod views;
