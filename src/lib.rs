//! # `a2prodos` main library
//!
//! This library reads Apple ProDOS volumes, including the GS/OS extension for forked files.
//! It is strictly read only: volumes are never modified.
//!
//! ## Architecture
//!
//! Volume operations are built around `fs::prodos::Volume`, which wraps any stream that
//! implements `Read + Seek`.  The volume works from the bottom up:
//! * `fs::prodos::block` maps block numbers to stream offsets and enforces volume bounds
//! * `fs::prodos::directory` decodes headers and entries
//! * `fs::prodos::walk` follows chains of directory blocks
//! * `fs::prodos::files` rebuilds file contents from seedling, sapling, and tree structures
//! * `fs::prodos::forks` decodes the GS/OS extended key block
//! * `fs::prodos::bitmap` decodes the volume block allocation bitmap
//!
//! Images with more than one volume are handled by handing `fs::locate_volumes` a
//! `PartitionScanner`, then opening each `VolumeExtent` separately.
//!
//! ## Example
//!
//! ```no_run
//! use a2prodos::fs::prodos::Volume;
//! use a2prodos::fs::prodos::directory::HasName;
//! let file = std::fs::File::open("disk.po").expect("no image");
//! let mut vol = Volume::open(file).expect("not a ProDOS volume");
//! for entry in vol.enumerate_root().flatten() {
//!     println!("{}",entry.name());
//! }
//! ```

pub mod fs;
pub mod commands;

use std::fmt::Write;

pub type DYNERR = Box<dyn std::error::Error>;
pub type STDRESULT = Result<(),Box<dyn std::error::Error>>;

/// Display binary to stdout in columns of hex, +ascii, and -ascii
pub fn display_block(start_addr: u16,block: &[u8]) {
    let mut slice_start = 0;
    loop {
        let row_label = start_addr as usize + slice_start;
        let mut slice_end = slice_start + 16;
        if slice_end > block.len() {
            slice_end = block.len();
        }
        let slice = block[slice_start..slice_end].to_vec();
        let txt: Vec<u8> = slice.iter().map(|c| match *c {
            x if x<32 => '.' as u8,
            x if x<127 => x,
            _ => '.' as u8
        }).collect();
        let neg_txt: Vec<u8> = slice.iter().map(|c| match *c {
            x if x>=160 && x<255 => x - 128,
            _ => 46
        }).collect();
        print!("{:04X} : ",row_label);
        for byte in slice {
            print!("{:02X} ",byte);
        }
        for _blank in slice_end..slice_start+16 {
            print!("   ");
        }
        print!("|+| {} ",String::from_utf8_lossy(&txt));
        for _blank in slice_end..slice_start+16 {
            print!(" ");
        }
        println!("|-| {}",String::from_utf8_lossy(&neg_txt));
        slice_start += 16;
        if slice_end>=block.len() {
            break;
        }
    }
}

/// This takes any bytes and makes an ascii friendly string
/// by using hex escapes, e.g., `\xFF`.
/// if `escape_cc` is true, ascii control characters are also escaped.
/// if `inverted` is true, assume we have negative ascii bytes.
/// This is intended for directory strings.
pub fn escaped_ascii_from_bytes(bytes: &[u8],escape_cc: bool,inverted: bool) -> String {
    let mut result = String::new();
    let (lb,ub) = match (escape_cc,inverted) {
        (true,false) => (0x20,0x7e),
        (false,false) => (0x00,0x7f),
        (true,true) => (0xa0,0xfe),
        (false,true) => (0x80,0xff)
    };
    for b in bytes {
        if *b>=lb && *b<=ub {
            match inverted {
                true => result.push((*b - 0x80) as char),
                false => result.push(*b as char)
            }
        } else {
            // writing to a String cannot fail
            let _ = write!(&mut result,"\\x{:02X}",b);
        }
    }
    result
}

#[test]
fn escapes() {
    assert_eq!(escaped_ascii_from_bytes(b"AB\x01C",true,false),"AB\\x01C");
    assert_eq!(escaped_ascii_from_bytes(&[0xc1,0xc2,0x7f],true,true),"AB\\x7F");
    assert_eq!(escaped_ascii_from_bytes(&[0x41,0x80],false,false),"A\\x80");
}
