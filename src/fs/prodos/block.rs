//! ### Block access
//!
//! Maps logical ProDOS blocks onto a byte range of any `Read + Seek` stream.
//! The range starts at `offset` and spans `len` bytes, which lets one image hold
//! several volumes.  Blocks that the volume header says exist, but that lie past the
//! end of a truncated stream, read back as zeros.

use std::io::{Read,Seek,SeekFrom};
use log::{trace,debug,error};
use super::types::*;

pub struct BlockDevice<R: Read + Seek> {
    stream: R,
    offset: u64,
    len: u64,
    total_blocks: u16
}

impl<R: Read + Seek> BlockDevice<R> {
    /// Wrap the stream.  Until `set_total_blocks` is called there is no volume bound.
    pub fn new(stream: R, offset: u64, len: u64) -> Self {
        Self {
            stream,
            offset,
            len,
            total_blocks: 0
        }
    }
    pub fn set_total_blocks(&mut self,total: u16) {
        self.total_blocks = total;
    }
    pub fn total_blocks(&self) -> u16 {
        self.total_blocks
    }
    /// Byte offset of block 0 within the stream
    pub fn offset(&self) -> u64 {
        self.offset
    }
    /// Length in bytes of the part of the stream that belongs to this volume
    pub fn len(&self) -> u64 {
        self.len
    }
    pub fn into_inner(self) -> R {
        self.stream
    }
    /// Read one block.  Bounds are checked against the volume's total block count,
    /// then against the stream extent.
    pub fn read_block(&mut self,iblock: u16) -> Result<[u8;BLOCK_SIZE],Error> {
        let total = self.total_blocks;
        if total != 0 && iblock > total {
            error!("block {} is beyond the end of the volume ({} blocks)",iblock,total);
            return Err(Error::OutOfBounds { block: iblock, total });
        }
        let rel = iblock as u64 * BLOCK_SIZE as u64;
        if rel + BLOCK_SIZE as u64 > self.len {
            if total != 0 && iblock < total {
                debug!("block {} is missing from the stream, using zeros",iblock);
                return Ok([0;BLOCK_SIZE]);
            }
            error!("block {} is beyond the end of the stream",iblock);
            return Err(Error::OutOfBounds { block: iblock, total });
        }
        trace!("read block {}",iblock);
        let mut buf = [0;BLOCK_SIZE];
        if let Err(e) = self.stream.seek(SeekFrom::Start(self.offset + rel)) {
            error!("seek to block {} failed: {}",iblock,e);
            return Err(Error::ReadFailed { block: iblock, source: e });
        }
        let mut filled = 0;
        while filled < BLOCK_SIZE {
            match self.stream.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind()==std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("read of block {} failed: {}",iblock,e);
                    return Err(Error::ReadFailed { block: iblock, source: e });
                }
            }
        }
        if filled < BLOCK_SIZE {
            error!("short read at block {}, got {} bytes",iblock,filled);
            return Err(Error::ShortRead(iblock));
        }
        Ok(buf)
    }
}

#[cfg(test)]
fn numbered_blocks(count: usize) -> Vec<u8> {
    let mut ans = Vec::new();
    for i in 0..count {
        ans.append(&mut vec![i as u8;BLOCK_SIZE]);
    }
    ans
}

#[test]
fn offset_and_bounds() {
    // volume starts one block into the stream
    let img = numbered_blocks(8);
    let mut dev = BlockDevice::new(std::io::Cursor::new(img),512,7*512);
    dev.set_total_blocks(10);
    assert_eq!(dev.read_block(0).expect("read failed"),[1;BLOCK_SIZE]);
    assert_eq!(dev.read_block(6).expect("read failed"),[7;BLOCK_SIZE]);
    // inside the volume, outside the stream
    assert_eq!(dev.read_block(9).expect("read failed"),[0;BLOCK_SIZE]);
    // block equal to the total is past the stream and not below the total
    match dev.read_block(10) {
        Err(Error::OutOfBounds { block: 10, total: 10 }) => {},
        _ => panic!("block 10 should be out of bounds")
    }
    match dev.read_block(11) {
        Err(e) => assert_eq!(e.kind(),ErrorKind::Io),
        Ok(_) => panic!("block 11 should be out of bounds")
    }
}

#[test]
fn unbounded_before_header() {
    let mut dev = BlockDevice::new(std::io::Cursor::new(numbered_blocks(4)),0,4*512);
    assert_eq!(dev.read_block(3).expect("read failed"),[3;BLOCK_SIZE]);
    assert!(dev.read_block(4).is_err());
}

#[cfg(test)]
struct BrokenStream;

#[cfg(test)]
impl Read for BrokenStream {
    fn read(&mut self,_buf: &mut [u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(std::io::ErrorKind::Other,"device gone"))
    }
}

#[cfg(test)]
impl Seek for BrokenStream {
    fn seek(&mut self,_pos: SeekFrom) -> std::io::Result<u64> {
        Ok(0)
    }
}

#[test]
fn read_error_names_block() {
    let mut dev = BlockDevice::new(BrokenStream,0,16*512);
    match dev.read_block(5) {
        Err(e) => {
            assert_eq!(e.kind(),ErrorKind::Io);
            assert_eq!(e.to_string(),"READ FAILED AT BLOCK 5: device gone");
            assert!(matches!(e,Error::ReadFailed { block: 5, .. }));
        },
        Ok(_) => panic!("read from a broken stream should fail")
    }
}
