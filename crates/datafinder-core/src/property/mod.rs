//! Property definitions, typed properties and the definition registry.

mod definition;
mod instance;
pub mod registry;
mod types;

pub use definition::{PropertyCategory, PropertyDefinition};
pub use instance::Property;
pub use registry::{PropertyDefinitionRegistry, RegistryError};
pub use types::{PropertyType, Restrictions};
