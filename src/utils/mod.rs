//! Utility modules shared by the service clients and the terminal front end.
//!
//! - [`HttpClient`]: reqwest client with the crate's user agent and timeouts
//! - [`send_checked`]: send a request and map failures onto [`SourceError`](crate::sources::SourceError)
//! - [`cut_to_width`]: unicode-aware truncation for previews

mod display;
mod http;

pub use display::{cut_to_width, display_width, squash_whitespace};
pub use http::{send_checked, HttpClient};
