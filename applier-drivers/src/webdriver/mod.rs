//! fantoccini-backed [`Browser`](crate::Browser) implementation.
mod scripts;
mod session;

pub use session::{WebDriverBrowser, WebDriverOptions};
