//! Shared helpers for the DeblurGAN command line tools.

pub mod backend;

pub use backend::{create_device, get_backend_name, SelectedBackend, SelectedDevice};
