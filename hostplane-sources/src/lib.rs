//! # Hostplane Configuration Sources
//!
//! Collectors that expose each origin of configuration overrides behind the
//! uniform [`RawSource`] contract: string keys to string values, tagged with
//! a ranked [`SourceId`].
//!
//! | source                 | rank | collector           |
//! |------------------------|------|---------------------|
//! | process environment    | 0    | [`EnvSource`]       |
//! | local file             | 1    | [`FileSource`]      |
//! | per-host datastore obj | 2    | [`DatastoreSource`] |
//! | global datastore obj   | 3    | [`DatastoreSource`] |

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

mod datastore;
mod env;
mod error;
mod file;
mod flatten;
mod source;

pub use datastore::{DatastoreHandle, DatastoreSource};
pub use env::{EnvSource, DEFAULT_ENV_PREFIX};
pub use error::SourceError;
pub use file::FileSource;
pub use flatten::flatten_object;
pub use source::{RawMap, RawSource, SourceId, StaticSource};
