use anyhow::{Context, Result};
use std::path::Path;

/// A packed file mapped into memory, read as bytes.
pub struct MappedFile {
    mmap: memmap2::Mmap,
}

impl std::ops::Deref for MappedFile {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.mmap
    }
}

// Safety: This is safe for as long as the underlying file is not modified.
pub fn map_file(path: &Path) -> Result<MappedFile> {
    let file = std::fs::File::open(path).with_context(|| format!("Cannot open {:?}", path))?;
    // Safety: This is safe for as long as the underlying file is not modified.
    let mmap = unsafe { memmap2::Mmap::map(&file)? };
    Ok(MappedFile { mmap })
}
