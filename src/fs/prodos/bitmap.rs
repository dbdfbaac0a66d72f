//! ### Volume block allocation bitmap
//!
//! One bit per block, set means free.  Bits are packed most significant first,
//! which is the order `BitVec::from_bytes` uses, so block `n` is simply bit `n`.

use bit_vec::BitVec;
use log::{debug,error};
use super::types::*;

/// Blocks each bitmap block can describe
pub const BLOCKS_PER_BITMAP_BLOCK: usize = BLOCK_SIZE * 8;

/// Number of bitmap blocks needed for a volume with `total_blocks` blocks
pub fn bitmap_block_count(total_blocks: u16) -> usize {
    (total_blocks as usize).div_ceil(BLOCKS_PER_BITMAP_BLOCK)
}

#[derive(Clone,Debug)]
pub struct VolumeBitmap {
    raw: Vec<u8>,
    bits: BitVec,
    total_blocks: u16,
    free: usize
}

impl VolumeBitmap {
    /// Build from the concatenated bitmap blocks.  Bits past the end of `raw` count as used.
    pub fn new(raw: Vec<u8>, total_blocks: u16) -> Self {
        let total = total_blocks as usize;
        let mut bits = BitVec::from_bytes(&raw);
        if bits.len() < total {
            debug!("bitmap buffer covers {} blocks, volume has {}",bits.len(),total);
            bits.grow(total - bits.len(),false);
        }
        bits.truncate(total);
        let free = bits.iter().filter(|b| *b).count();
        Self {
            raw,
            bits,
            total_blocks,
            free
        }
    }
    fn check(&self,iblock: u16) -> Result<usize,Error> {
        if iblock >= self.total_blocks {
            error!("block {} is not in the bitmap, volume has {} blocks",iblock,self.total_blocks);
            return Err(Error::InvalidArgument(format!("block {} out of range 0..{}",iblock,self.total_blocks)));
        }
        Ok(iblock as usize)
    }
    pub fn is_block_free(&self,iblock: u16) -> Result<bool,Error> {
        let i = self.check(iblock)?;
        Ok(self.bits[i])
    }
    pub fn is_block_used(&self,iblock: u16) -> Result<bool,Error> {
        Ok(!self.is_block_free(iblock)?)
    }
    pub fn free_block_count(&self) -> usize {
        self.free
    }
    pub fn used_block_count(&self) -> usize {
        self.total_blocks as usize - self.free
    }
    pub fn total_blocks(&self) -> u16 {
        self.total_blocks
    }
    pub fn free_blocks(&self) -> impl Iterator<Item = u16> + '_ {
        self.bits.iter().enumerate().filter(|(_,b)| *b).map(|(i,_)| i as u16)
    }
    pub fn used_blocks(&self) -> impl Iterator<Item = u16> + '_ {
        self.bits.iter().enumerate().filter(|(_,b)| !*b).map(|(i,_)| i as u16)
    }
    /// The bitmap bytes as read from the volume
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

#[test]
fn block_counts() {
    assert_eq!(bitmap_block_count(280),1);
    assert_eq!(bitmap_block_count(4096),1);
    assert_eq!(bitmap_block_count(4097),2);
    assert_eq!(bitmap_block_count(65535),16);
}

#[test]
fn msb_first() {
    // blocks 0 and 9 used, everything else free, 12 blocks total
    let bitmap = VolumeBitmap::new(vec![0x7f,0xbf,0xff],12);
    assert!(bitmap.is_block_used(0).expect("range"));
    assert!(bitmap.is_block_free(1).expect("range"));
    assert!(bitmap.is_block_used(9).expect("range"));
    assert!(bitmap.is_block_free(11).expect("range"));
    assert_eq!(bitmap.free_block_count(),10);
    assert_eq!(bitmap.used_block_count(),2);
    assert_eq!(bitmap.used_blocks().collect::<Vec<u16>>(),vec![0,9]);
    assert_eq!(bitmap.free_blocks().count(),10);
    match bitmap.is_block_free(12) {
        Err(e) => assert_eq!(e.kind(),ErrorKind::InvalidArgument),
        Ok(_) => panic!("block 12 should be out of range")
    }
}

#[test]
fn short_buffer_is_used() {
    let bitmap = VolumeBitmap::new(vec![0xff],20);
    assert_eq!(bitmap.free_block_count(),8);
    assert_eq!(bitmap.used_block_count(),12);
    assert!(bitmap.is_block_used(19).expect("range"));
}
