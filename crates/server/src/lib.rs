pub mod api;
pub mod attachments;
pub mod bootstrap;
pub mod dashboard;
pub mod health;
pub mod notify;
pub mod templates;

pub use bootstrap::{bootstrap, bootstrap_with_config, Application, BootstrapError};
