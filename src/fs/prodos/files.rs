//! ### File data reconstruction
//!
//! Walks the index structure implied by the storage type and streams the file's
//! bytes into any `Write`.  Every length is clamped to the EOF.  A pointer of zero,
//! at any level, is a sparse hole and produces zeros without touching the volume.

use std::io::{Read,Seek,Write};
use log::{trace,debug,error};
use super::block::BlockDevice;
use super::forks::{ExtendedKeyBlock,ForkEntry};
use super::types::*;

const ZEROS: [u8;BLOCK_SIZE] = [0;BLOCK_SIZE];

/// Get pointer `idx` out of an index block, low bytes are in the first half, high bytes in the second
pub fn get_index_ptr(buf: &[u8;BLOCK_SIZE],idx: usize) -> u16 {
    u16::from_le_bytes([buf[idx],buf[idx+256]])
}

fn write_zeros<W: Write>(sink: &mut W,count: usize) -> Result<usize,Error> {
    let mut remaining = count;
    while remaining > 0 {
        let n = usize::min(remaining,BLOCK_SIZE);
        sink.write_all(&ZEROS[0..n])?;
        remaining -= n;
    }
    Ok(count)
}

/// Write up to one block of data, `count` is at most 512
fn write_data_block<R: Read + Seek,W: Write>(dev: &mut BlockDevice<R>,ptr: u16,count: usize,sink: &mut W) -> Result<usize,Error> {
    if count==0 {
        return Ok(0);
    }
    if ptr==0 {
        return write_zeros(sink,count);
    }
    let buf = dev.read_block(ptr)?;
    sink.write_all(&buf[0..count])?;
    Ok(count)
}

/// Write the data referenced by a single index block, `count` is in bytes and covers at most 256 blocks
fn write_index_block<R: Read + Seek,W: Write>(dev: &mut BlockDevice<R>,index_ptr: u16,count: usize,sink: &mut W) -> Result<usize,Error> {
    if count==0 {
        return Ok(0);
    }
    if index_ptr==0 {
        return write_zeros(sink,count);
    }
    let index_block = dev.read_block(index_ptr)?;
    let mut written = 0;
    for idx in 0..256 {
        if written >= count {
            break;
        }
        let bytes = usize::min(count - written,BLOCK_SIZE);
        written += write_data_block(dev,get_index_ptr(&index_block,idx),bytes,sink)?;
    }
    Ok(written)
}

/// Write the data referenced by a master index block
fn write_master_index_block<R: Read + Seek,W: Write>(dev: &mut BlockDevice<R>,master_ptr: u16,count: usize,sink: &mut W) -> Result<usize,Error> {
    if count==0 {
        return Ok(0);
    }
    if master_ptr==0 {
        return write_zeros(sink,count);
    }
    let master_block = dev.read_block(master_ptr)?;
    let mut written = 0;
    for idx in 0..256 {
        if written >= count {
            break;
        }
        let bytes = usize::min(count - written,SAPLING_MAX_EOF);
        let ptr = get_index_ptr(&master_block,idx);
        if ptr==0 {
            trace!("sparse index block at master index {}",idx);
        }
        written += write_index_block(dev,ptr,bytes,sink)?;
    }
    Ok(written)
}

/// Write a directory as raw blocks, following the `next` links until `eof` bytes are written.
fn write_dir_blocks<R: Read + Seek,W: Write>(dev: &mut BlockDevice<R>,key_ptr: u16,eof: usize,sink: &mut W) -> Result<usize,Error> {
    let mut curr = key_ptr;
    let mut written = 0;
    let mut visited = 0;
    while written < eof && curr > 0 {
        if visited > dev.total_blocks() as usize {
            error!("directory block chain starting at {} does not terminate",key_ptr);
            return Err(Error::Format(format!("directory chain at block {} does not terminate",key_ptr)));
        }
        visited += 1;
        let buf = dev.read_block(curr)?;
        let bytes = usize::min(eof - written,BLOCK_SIZE);
        sink.write_all(&buf[0..bytes])?;
        written += bytes;
        curr = u16::from_le_bytes([buf[2],buf[3]]);
    }
    if written < eof {
        debug!("directory chain ended {} bytes short of its EOF",eof - written);
        written += write_zeros(sink,eof - written)?;
    }
    Ok(written)
}

/// Write a standard file's data given its storage type, key pointer, and EOF.
/// Only seedling, sapling, and tree are accepted here.
pub fn write_standard<R: Read + Seek,W: Write>(
    dev: &mut BlockDevice<R>,stype: StorageType,key_ptr: u16,eof: usize,sink: &mut W
) -> Result<usize,Error> {
    match stype {
        StorageType::Seedling => write_data_block(dev,key_ptr,usize::min(eof,BLOCK_SIZE),sink),
        StorageType::Sapling => write_index_block(dev,key_ptr,usize::min(eof,SAPLING_MAX_EOF),sink),
        StorageType::Tree => write_master_index_block(dev,key_ptr,usize::min(eof,TREE_MAX_EOF),sink),
        other => Err(Error::Unsupported { stype: other as u8, name: "index structure".to_string() })
    }
}

/// Write one fork of a forked file.  Empty or invalid forks write nothing and read nothing.
pub fn write_fork<R: Read + Seek,W: Write>(dev: &mut BlockDevice<R>,fork: &ForkEntry,sink: &mut W) -> Result<usize,Error> {
    if fork.is_empty() {
        return Ok(0);
    }
    match fork.storage_type() {
        Some(stype) if fork.is_valid() => write_standard(dev,stype,fork.get_ptr(),fork.eof(),sink),
        _ => {
            debug!("skipping fork with invalid storage type");
            Ok(0)
        }
    }
}

pub fn read_extended_key_block<R: Read + Seek>(dev: &mut BlockDevice<R>,key_ptr: u16) -> Result<ExtendedKeyBlock,Error> {
    let buf = dev.read_block(key_ptr)?;
    ExtendedKeyBlock::from_bytes(&buf)
}

/// Dispatch on storage type.  For a forked file this is the data fork.
/// A subdirectory produces its raw directory blocks.
pub fn write_file<R: Read + Seek,W: Write>(
    dev: &mut BlockDevice<R>,stype: Option<StorageType>,stor_nibble: u8,key_ptr: u16,eof: usize,name: &str,sink: &mut W
) -> Result<usize,Error> {
    match stype {
        Some(s @ (StorageType::Seedling | StorageType::Sapling | StorageType::Tree)) => {
            write_standard(dev,s,key_ptr,eof,sink)
        },
        Some(StorageType::GSOSForkedFile) => {
            let ekb = read_extended_key_block(dev,key_ptr)?;
            write_fork(dev,&ekb.data_fork,sink)
        },
        Some(StorageType::SubDirEntry) => write_dir_blocks(dev,key_ptr,eof,sink),
        _ => {
            debug!("cannot read {} with storage type ${:X}",name,stor_nibble);
            Err(Error::Unsupported { stype: stor_nibble, name: name.to_string() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn image(blocks: usize) -> Vec<u8> {
        vec![0;blocks*BLOCK_SIZE]
    }
    fn fill(img: &mut Vec<u8>,iblock: usize,val: u8) {
        img[iblock*BLOCK_SIZE..(iblock+1)*BLOCK_SIZE].fill(val);
    }
    fn set_ptr(img: &mut Vec<u8>,iblock: usize,idx: usize,ptr: u16) {
        img[iblock*BLOCK_SIZE+idx] = ptr.to_le_bytes()[0];
        img[iblock*BLOCK_SIZE+idx+256] = ptr.to_le_bytes()[1];
    }
    fn device(img: Vec<u8>) -> BlockDevice<Cursor<Vec<u8>>> {
        let len = img.len() as u64;
        let mut dev = BlockDevice::new(Cursor::new(img),0,len);
        dev.set_total_blocks((len / 512) as u16);
        dev
    }

    #[test]
    fn seedling() {
        let mut img = image(16);
        fill(&mut img,7,0xaa);
        let mut dev = device(img);
        let mut out = Vec::new();
        let n = write_standard(&mut dev,StorageType::Seedling,7,100,&mut out).expect("read failed");
        assert_eq!(n,100);
        assert_eq!(out,vec![0xaa;100]);
        // EOF beyond one block is clamped
        out.clear();
        assert_eq!(write_standard(&mut dev,StorageType::Seedling,7,4000,&mut out).expect("read failed"),512);
    }

    #[test]
    fn sparse_sapling() {
        let mut img = image(16);
        set_ptr(&mut img,8,0,9);
        set_ptr(&mut img,8,2,10);
        fill(&mut img,9,1);
        fill(&mut img,10,3);
        let mut dev = device(img);
        let mut out = Vec::new();
        let n = write_standard(&mut dev,StorageType::Sapling,8,1200,&mut out).expect("read failed");
        assert_eq!(n,1200);
        assert_eq!(out[0..512],[1;512]);
        assert_eq!(out[512..1024],[0;512]);
        assert_eq!(out[1024..1200],[3;176]);
    }

    #[test]
    fn tree_with_hole() {
        let mut img = image(16);
        // master index at 4, first index block missing, second at 5
        set_ptr(&mut img,4,1,5);
        set_ptr(&mut img,5,0,6);
        fill(&mut img,6,0x42);
        let mut dev = device(img);
        let mut out = Vec::new();
        let eof = SAPLING_MAX_EOF + 300;
        let n = write_standard(&mut dev,StorageType::Tree,4,eof,&mut out).expect("read failed");
        assert_eq!(n,eof);
        assert!(out[0..SAPLING_MAX_EOF].iter().all(|b| *b==0));
        assert_eq!(out[SAPLING_MAX_EOF..],[0x42;300]);
    }

    #[test]
    fn zero_key_pointer() {
        let mut dev = device(image(8));
        let mut out = Vec::new();
        assert_eq!(write_standard(&mut dev,StorageType::Sapling,0,700,&mut out).expect("read failed"),700);
        assert_eq!(out,vec![0;700]);
    }

    #[test]
    fn unsupported() {
        let mut dev = device(image(8));
        let mut out = Vec::new();
        match write_file(&mut dev,Some(StorageType::PascalArea),4,2,100,"PASCAL.AREA",&mut out) {
            Err(e) => assert_eq!(e.kind(),ErrorKind::Unsupported),
            Ok(_) => panic!("pascal area should not be readable")
        }
        assert!(write_file(&mut dev,None,7,2,100,"WEIRD",&mut out).is_err());
    }
}
