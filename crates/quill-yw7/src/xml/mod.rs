//! XML plumbing shared by the reader and the writer.

pub mod decode;
pub mod dom;

pub use decode::{decode_document, strip_illegal_characters};
pub use dom::Element;
