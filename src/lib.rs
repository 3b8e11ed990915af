//! # Huffpack Library
//!
//! Package one or more files (or whole directory trees) into a single
//! Huffman-coded container, list its contents, extract members, verify
//! integrity, and replace single members in place.
//!
//! Every member is compressed independently with its own Huffman tree, so
//! any member can be decoded straight from its recorded offsets without
//! touching the others. A CRC-32 trailer guards the whole container.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::{Path, PathBuf};
//! let count = huffpack::encoder::create(&[PathBuf::from("notes")], Path::new("notes.hpk"))
//!     .expect("archiving failed");
//! eprintln!("stored {} files", count);
//! huffpack::decoder::extract_all(Path::new("notes.hpk"), Path::new("restored"))
//!     .expect("extraction failed");
//! ```

mod tools;
pub mod container;
pub mod huffman;
pub mod encoder;
pub mod decoder;
pub mod walk;

type DYNERR = Box<dyn std::error::Error>;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

/// Archive Errors
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("member or input not found")]
    NotFound,
    #[error("file too large")]
    TooLarge,
    #[error("archive is corrupted")]
    Corrupted,
    #[error("invalid path argument")]
    InvalidArgument
}
