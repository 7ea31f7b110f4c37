//! Pages and page sets.
//!
//! A [`Page`] is one content file (or an in-memory stand-in) parsed by the
//! parser its extension maps to in a [`ParserRegistry`]. A [`Pageset`] keys
//! pages by path and serves sorted, cached views and subsets of them.

pub mod accessors;
pub mod loader;
pub mod page;
pub mod pageset;
pub mod registry;

pub use loader::{load_dir, LoadError};
pub use page::{Page, PageError, PageSnapshot};
pub use pageset::{Pageset, PagesetError};
pub use registry::ParserRegistry;
