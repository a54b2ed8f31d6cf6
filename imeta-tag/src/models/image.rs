//! Image inputs

use std::path::Path;

/// Name and size of an image, as recorded in its document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    /// Original file name (no directory)
    pub name: String,
    /// File size in bytes
    pub size_bytes: u64,
}

/// An image held in memory together with its original file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Build from a path's file name and already-read bytes
    pub fn from_path(path: &Path, bytes: Vec<u8>) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Self::new(name, bytes)
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn descriptor(&self) -> ImageDescriptor {
        ImageDescriptor {
            name: self.name.clone(),
            size_bytes: self.size_bytes(),
        }
    }
}
