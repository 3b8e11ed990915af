//! Resolves user input paths into the member list the encoder consumes.

use std::fs;
use std::path::{Path, PathBuf};

use crate::container;
use crate::DYNERR;

/// One file slated for archiving.
pub struct Entry {
    /// path usable for opening the file
    pub full: PathBuf,
    /// stored relative path, `\`-separated
    pub stored: String,
    /// last path segment
    pub name: String
}

/// Expand each input into its files. A directory contributes every file
/// beneath it, stored relative to the directory's parent so the directory
/// name itself leads every stored path; a plain file is stored under its
/// bare name.
pub fn collect_entries(inputs: &[PathBuf]) -> Result<Vec<Entry>, DYNERR> {
    if inputs.is_empty() {
        return Err(Box::new(crate::Error::InvalidArgument));
    }
    let mut entries: Vec<Entry> = Vec::new();
    for input in inputs {
        if !input.exists() {
            log::error!("{} does not exist", input.display());
            return Err(Box::new(crate::Error::NotFound));
        }
        if input.is_dir() {
            let base = input.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
            visit(input, &base, &mut entries)?;
        } else {
            let name = match input.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => return Err(Box::new(crate::Error::InvalidArgument))
            };
            log::info!("{}", input.display());
            entries.push(Entry { full: input.clone(), stored: name.clone(), name });
        }
    }
    Ok(entries)
}

fn visit(dir: &Path, base: &Path, entries: &mut Vec<Entry>) -> Result<(), DYNERR> {
    for item in fs::read_dir(dir)? {
        let path = item?.path();
        if path.is_dir() {
            visit(&path, base, entries)?;
        } else {
            let stored = container::stored_path(path.strip_prefix(base)?);
            let name = container::file_name(&stored).to_string();
            log::info!("{}", path.display());
            entries.push(Entry { full: path, stored, name });
        }
    }
    Ok(())
}
