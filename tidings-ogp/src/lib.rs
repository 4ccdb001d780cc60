//! Open Graph metadata for web pages.
//!
//! - [`parse_page`] turns an HTML document into a [`Page`] following the
//!   structured-property rules of <https://ogp.me>
//! - [`OgClient`] fetches a page over `tidings-http` and parses it
//!
//! ```rust
//! let page = tidings_ogp::parse_page(
//!     r#"<meta property="og:title" content="Hello"><meta property="og:image" content="https://x/a.png">"#,
//! );
//! assert_eq!(page.title.as_deref(), Some("Hello"));
//! assert_eq!(page.images.len(), 1);
//! ```
pub mod client;
pub mod parse;
pub mod types;

pub use client::{OgClient, OgError};
pub use parse::parse_page;
pub use types::{Audio, Image, Page, Video};
