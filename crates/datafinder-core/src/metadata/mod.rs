//! Metadata values and their persistence format.

mod metadata_value;
pub mod value;
pub mod value_mapping;

pub use metadata_value::MetadataValue;
pub use value::{Value, ValueKind};
pub use value_mapping::{
    decode, decode_list, encode_dynamic, guess_representation, persistence_representation,
};
