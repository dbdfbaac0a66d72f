// Builds small ProDOS images in memory for the integration tests.
#![allow(dead_code)]

use std::cell::Cell;
use std::io::{Cursor,Read,Seek,SeekFrom};
use std::rc::Rc;

pub const BLOCK_SIZE: usize = 512;
pub const ENTRY_LEN: usize = 39;
pub const VOL_NAME: &str = "TEST.VOL";
pub const TOTAL_BLOCKS: u16 = 280;

pub struct ImageBuilder {
    img: Vec<u8>
}

/// Create a 39 byte file entry
pub fn entry(stype: u8,name: &str,ftype: u8,key: u16,blocks: u16,eof: u32,access: u8) -> [u8;ENTRY_LEN] {
    let mut ans = [0;ENTRY_LEN];
    ans[0] = (stype << 4) + name.len() as u8;
    ans[1..1+name.len()].copy_from_slice(name.as_bytes());
    ans[0x10] = ftype;
    ans[0x11..0x13].copy_from_slice(&key.to_le_bytes());
    ans[0x13..0x15].copy_from_slice(&blocks.to_le_bytes());
    ans[0x15..0x18].copy_from_slice(&eof.to_le_bytes()[0..3]);
    // 14-Mar-85 10:30
    let date: u16 = (85 << 9) + (3 << 5) + 14;
    let time: u16 = (10 << 8) + 30;
    ans[0x18..0x1a].copy_from_slice(&date.to_le_bytes());
    ans[0x1a..0x1c].copy_from_slice(&time.to_le_bytes());
    ans[0x1e] = access;
    ans[0x1f..0x21].copy_from_slice(&0x2000u16.to_le_bytes());
    ans[0x21..0x23].copy_from_slice(&date.to_le_bytes());
    ans[0x23..0x25].copy_from_slice(&time.to_le_bytes());
    ans[0x25..0x27].copy_from_slice(&2u16.to_le_bytes());
    ans
}

/// Create a 39 byte subdirectory header
pub fn subdir_header(name: &str,parent_ptr: u16,parent_entry: u8,file_count: u16) -> [u8;ENTRY_LEN] {
    let mut ans = [0;ENTRY_LEN];
    ans[0] = 0xe0 + name.len() as u8;
    ans[1..1+name.len()].copy_from_slice(name.as_bytes());
    ans[0x10] = 0x75;
    ans[0x1e] = 0xc3;
    ans[0x1f] = ENTRY_LEN as u8;
    ans[0x20] = 13;
    ans[0x21..0x23].copy_from_slice(&file_count.to_le_bytes());
    ans[0x23..0x25].copy_from_slice(&parent_ptr.to_le_bytes());
    ans[0x25] = parent_entry;
    ans[0x26] = ENTRY_LEN as u8;
    ans
}

impl ImageBuilder {
    /// Formatted volume: directory in blocks 2-5, bitmap in block 6, blocks 0-6 in use
    pub fn new(name: &str,total: u16) -> Self {
        let mut ans = Self {
            img: vec![0;total as usize * BLOCK_SIZE]
        };
        for (blk,prev,next) in [(2,0,3),(3,2,4),(4,3,5),(5,4,0)] {
            ans.set_links(blk,prev,next);
        }
        let hdr = ans.slot_offset(2,0);
        ans.img[hdr] = 0xf0 + name.len() as u8;
        ans.img[hdr+1..hdr+1+name.len()].copy_from_slice(name.as_bytes());
        ans.img[hdr+0x1e] = 0xc3;
        ans.img[hdr+0x1f] = ENTRY_LEN as u8;
        ans.img[hdr+0x20] = 13;
        ans.img[hdr+0x23..hdr+0x25].copy_from_slice(&6u16.to_le_bytes());
        ans.img[hdr+0x25..hdr+0x27].copy_from_slice(&total.to_le_bytes());
        // everything free, then claim the system blocks
        let bitmap_bytes = (total as usize + 7) / 8;
        for i in 0..bitmap_bytes {
            ans.img[6*BLOCK_SIZE+i] = 0xff;
        }
        for i in 0..7 {
            ans.mark_used(i);
        }
        ans
    }
    /// Offset of a directory slot, in the key block slot 0 is the header
    pub fn slot_offset(&self,iblock: u16,slot: usize) -> usize {
        iblock as usize * BLOCK_SIZE + 4 + slot * ENTRY_LEN
    }
    pub fn set_links(&mut self,iblock: u16,prev: u16,next: u16) {
        let off = iblock as usize * BLOCK_SIZE;
        self.img[off..off+2].copy_from_slice(&prev.to_le_bytes());
        self.img[off+2..off+4].copy_from_slice(&next.to_le_bytes());
    }
    pub fn put_entry(&mut self,iblock: u16,slot: usize,dat: &[u8;ENTRY_LEN]) {
        let off = self.slot_offset(iblock,slot);
        self.img[off..off+ENTRY_LEN].copy_from_slice(dat);
    }
    /// Set the file count in the header found in `key_block`
    pub fn set_file_count(&mut self,key_block: u16,count: u16) {
        let off = self.slot_offset(key_block,0) + 0x21;
        self.img[off..off+2].copy_from_slice(&count.to_le_bytes());
    }
    pub fn set_lowercase_flags(&mut self,flags: u16) {
        let off = self.slot_offset(2,0) + 0x16;
        self.img[off..off+2].copy_from_slice(&flags.to_le_bytes());
    }
    pub fn block_mut(&mut self,iblock: u16) -> &mut [u8] {
        let off = iblock as usize * BLOCK_SIZE;
        &mut self.img[off..off+BLOCK_SIZE]
    }
    pub fn fill(&mut self,iblock: u16,val: u8) {
        self.block_mut(iblock).fill(val);
    }
    pub fn set_index(&mut self,iblock: u16,idx: usize,ptr: u16) {
        let blk = self.block_mut(iblock);
        blk[idx] = ptr.to_le_bytes()[0];
        blk[idx+256] = ptr.to_le_bytes()[1];
    }
    pub fn mark_used(&mut self,iblock: u16) {
        let off = 6*BLOCK_SIZE + iblock as usize / 8;
        self.img[off] &= !(0x80 >> (iblock % 8));
    }
    pub fn bytes(self) -> Vec<u8> {
        self.img
    }
}

/// The standard test volume.
///
/// | path | storage | blocks |
/// |---|---|---|
/// | HELLO | seedling, eof 100, all $48 | 7 |
/// | BIG | sapling, eof 1300, second pointer sparse | index 8, data 9 ($11), 10 ($22) |
/// | SUBDIR | subdirectory, eof 512 | 11 |
/// | SUBDIR/NOTE | seedling, eof 20, all $4E | 12 |
/// | SUBDIR/PASCAL | Pascal area | none |
/// | FORKED | GS/OS forked, data eof 50, resource eof 600 | key 13, data 14 ($D1), rsrc index 15, 16 ($E1), 17 ($E2) |
/// | NOFORK | GS/OS forked, both forks empty | key 18 |
///
/// There is a deleted entry between BIG and SUBDIR, and FORKED and NOFORK are in the second directory block.
pub fn standard_image() -> Vec<u8> {
    let mut b = ImageBuilder::new(VOL_NAME,TOTAL_BLOCKS);
    b.put_entry(2,1,&entry(1,"HELLO",0x04,7,1,100,0xe3));
    b.fill(7,0x48);
    b.put_entry(2,2,&entry(2,"BIG",0x06,8,3,1300,0xc1));
    b.set_index(8,0,9);
    b.set_index(8,2,10);
    b.fill(9,0x11);
    b.fill(10,0x22);
    let mut deleted = entry(1,"GONE",0x04,30,1,10,0xe3);
    deleted[0] = 0x04;
    b.put_entry(2,3,&deleted);
    b.put_entry(2,4,&entry(0xd,"SUBDIR",0x0f,11,1,512,0xe3));
    b.set_links(11,0,0);
    b.put_entry(11,0,&subdir_header("SUBDIR",2,4,2));
    b.put_entry(11,1,&entry(1,"NOTE",0x04,12,1,20,0xe3));
    b.fill(12,0x4e);
    b.put_entry(11,2,&entry(4,"PASCAL",0xef,0,0,0,0xe3));
    b.put_entry(3,0,&entry(5,"FORKED",0xb3,13,5,0,0xe3));
    {
        let ekb = b.block_mut(13);
        ekb[0] = 1;
        ekb[1..3].copy_from_slice(&14u16.to_le_bytes());
        ekb[3] = 1;
        ekb[5..8].copy_from_slice(&50u32.to_le_bytes()[0..3]);
        ekb[8] = 18;
        ekb[9] = 1;
        ekb[10..14].copy_from_slice(b"S16 ");
        ekb[14..18].copy_from_slice(b"pdos");
        ekb[0x100] = 2;
        ekb[0x101..0x103].copy_from_slice(&15u16.to_le_bytes());
        ekb[0x103] = 3;
        ekb[0x105..0x108].copy_from_slice(&600u32.to_le_bytes()[0..3]);
    }
    b.fill(14,0xd1);
    b.set_index(15,0,16);
    b.set_index(15,1,17);
    b.fill(16,0xe1);
    b.fill(17,0xe2);
    b.put_entry(3,1,&entry(5,"NOFORK",0xb3,18,1,0,0xe3));
    b.set_file_count(2,5);
    for i in 7..19 {
        b.mark_used(i);
    }
    b.bytes()
}

/// Wraps a stream and counts calls to `read`
pub struct CountingReader {
    inner: Cursor<Vec<u8>>,
    pub reads: Rc<Cell<usize>>
}

impl CountingReader {
    pub fn new(img: Vec<u8>) -> Self {
        Self {
            inner: Cursor::new(img),
            reads: Rc::new(Cell::new(0))
        }
    }
}

impl Read for CountingReader {
    fn read(&mut self,buf: &mut [u8]) -> std::io::Result<usize> {
        self.reads.set(self.reads.get() + 1);
        self.inner.read(buf)
    }
}

impl Seek for CountingReader {
    fn seek(&mut self,pos: SeekFrom) -> std::io::Result<u64> {
        self.inner.seek(pos)
    }
}
