// Security module for local file access
//
// Attachment upload reads local files and attachment download writes them.
// Both are restricted to the configured root directory when one is set.

pub mod path_validator;

pub use path_validator::{PathSecurityError, validate_input_path, validate_output_path};
