//! Dump sources.
//!
//! A [`DumpSource`] stands in for the device-access layer: given an address
//! and a buffer it fills the buffer with target memory. The encoders only see
//! the resulting bytes and the base address.
//!
//! ```text
//! +-------------+  read(addr, buf)  +-------------+  bytes, base  +---------+
//! | DumpSource  | <---------------- |  read_dump  | ------------> | encode  |
//! | mock / file |                   | (blocks of  |               |         |
//! +-------------+                   |  256 bytes) |               +---------+
//!                                   +-------------+
//! ```
//!
//! Real device drivers are out of scope; [`MockSource`] reproduces the
//! synthetic patterns of a mocked board and [`FileSource`] serves an
//! existing raw image.

pub mod file;
pub mod mock;

use log::debug;

use crate::error::{Error, Result};
use crate::request::DumpRequest;

pub use file::FileSource;
pub use mock::{MockPattern, MockSource};

/// Bytes requested from a source per read call.
pub const READ_BLOCK_SIZE: usize = 256;

/// Something that can serve reads of target memory.
pub trait DumpSource {
    /// Human-readable source name for logs.
    fn name(&self) -> &str;

    /// Fill `buf` with memory starting at `address`.
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()>;
}

impl<S: DumpSource + ?Sized> DumpSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        (**self).read(address, buf)
    }
}

/// Read the requested range in blocks, reporting progress.
///
/// Stops with [`Error::Interrupted`] when the checker registered through
/// [`crate::set_interrupt_checker`] fires between blocks.
pub fn read_dump<S>(
    source: &mut S,
    request: &DumpRequest,
    progress: &mut dyn FnMut(usize, usize),
) -> Result<Vec<u8>>
where
    S: DumpSource + ?Sized,
{
    read_dump_with(source, request, progress, &crate::is_interrupted_requested)
}

/// [`read_dump`] with an explicit interruption check.
pub fn read_dump_with<S>(
    source: &mut S,
    request: &DumpRequest,
    progress: &mut dyn FnMut(usize, usize),
    interrupted: &dyn Fn() -> bool,
) -> Result<Vec<u8>>
where
    S: DumpSource + ?Sized,
{
    request.end_address()?;
    debug!(
        "Reading {} bytes @ 0x{:08X} from {}",
        request.length,
        request.address,
        source.name()
    );

    let mut data = vec![0u8; request.length];
    let total = data.len();
    progress(0, total);

    for (i, block) in data.chunks_mut(READ_BLOCK_SIZE).enumerate() {
        if interrupted() {
            return Err(Error::Interrupted);
        }
        let offset = i * READ_BLOCK_SIZE;
        source.read(request.address + offset as u32, block)?;
        progress(offset + block.len(), total);
    }

    Ok(data)
}
