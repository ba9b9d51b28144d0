//! Raw binary image as a dump source.

use std::fs;
use std::path::Path;

use log::debug;

use crate::error::{Error, Result};

use super::DumpSource;

/// Serves reads from an in-memory image mapped at a load address.
pub struct FileSource {
    name: String,
    load_address: u32,
    data: Vec<u8>,
}

impl FileSource {
    /// Load a raw binary file, mapped at `load_address`.
    pub fn from_file<P: AsRef<Path>>(path: P, load_address: u32) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        debug!(
            "Loaded {} bytes from {} @ 0x{:08X}",
            data.len(),
            path.display(),
            load_address
        );
        Ok(Self::from_bytes(
            path.display().to_string(),
            load_address,
            data,
        ))
    }

    /// Wrap bytes already in memory.
    pub fn from_bytes(name: impl Into<String>, load_address: u32, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            load_address,
            data,
        }
    }

    /// Address of the first image byte.
    pub fn load_address(&self) -> u32 {
        self.load_address
    }

    /// Image size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the image is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The whole image.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl std::fmt::Debug for FileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSource")
            .field("name", &self.name)
            .field("load_address", &self.load_address)
            .field("data_len", &self.data.len())
            .finish()
    }
}

impl DumpSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        let end = u64::from(address) + buf.len() as u64;
        let image_end = u64::from(self.load_address) + self.data.len() as u64;
        if address < self.load_address || end > image_end {
            return Err(Error::OutOfRange { start: address, end });
        }

        let start = (address - self.load_address) as usize;
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
        Ok(())
    }
}
