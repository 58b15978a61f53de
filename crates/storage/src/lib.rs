#![forbid(unsafe_code)]

//! Directory encoding of mutation sets and allow-lists.

mod allowed;
mod codec;
mod compare;
mod document;
mod error;
pub mod layout;

pub use allowed::read_allowed_output_spec;
pub use codec::{read_mutation_set, read_mutation_set_partial, write_mutation_set};
pub use compare::{CompareError, compare_directories};
pub use document::{parse_document, render_document};
pub use error::{CodecError, CodecErrors};
