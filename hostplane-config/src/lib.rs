//! # Hostplane Parameter Model
//!
//! The static description of every agent parameter and the rules that turn
//! raw source strings into typed, validated values.
//!
//! ## Features
//! - **Registry**: one [`FieldDescriptor`] per parameter, with legacy aliases
//!   and case/underscore-insensitive lookup
//! - **Coercion**: kind-driven parsing of raw strings, including the `none`
//!   sentinel for explicitly empty lists
//! - **Validation**: per-field [`Rule`]s bound when the registry is built

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

mod coerce;
mod error;
mod kind;
pub mod params;
mod registry;
pub mod validation;
mod value;

pub use coerce::coerce;
pub use error::{describe_validation_error, CoercionError, RegistryError};
pub use kind::{TimeScale, ValueKind};
pub use registry::{normalise, FieldDescriptor, NameMatch, Registry};
pub use validation::Rule;
pub use value::{PortRange, ProtoPort, RouteTableRange, Value, NONE_SENTINEL};
