//! ### GS/OS extended key block
//!
//! A forked file's key block holds two 8 byte mini-entries, the data fork at $000
//! and the resource fork at $100.  Starting at $008 there may be up to two
//! Finder info records, each tagged with a size of 18 and a type byte.
//! Mini-entries are little endian, the Finder records are big endian since they
//! come from the Macintosh.

use std::io::Cursor;
use binrw::BinRead;
use log::{debug,error};
use num_traits::FromPrimitive;
use super::types::*;

const RSRC_FORK_OFFSET: usize = 0x100;
const FINDER_INFO_OFFSET: usize = 0x08;
const FINDER_ENTRY_SIZE: u8 = 18;
const FINFO_TAG: u8 = 1;
const FXINFO_TAG: u8 = 2;

/// Mini-entry locating one fork of a GS/OS forked file
#[derive(BinRead,Clone,Copy,Debug,PartialEq)]
#[br(little)]
pub struct ForkEntry {
    storage: u8,
    key_ptr: u16,
    blocks_used: u16,
    eof: [u8;3]
}

/// Macintosh FInfo record
#[derive(BinRead,Clone,Copy,Debug,PartialEq)]
#[br(big)]
pub struct FinderInfo {
    pub file_type: u32,
    pub creator: u32,
    pub flags: u16,
    pub location_v: i16,
    pub location_h: i16,
    pub folder: i16
}

/// Macintosh FXInfo record
#[derive(BinRead,Clone,Copy,Debug,PartialEq)]
#[br(big)]
pub struct ExtendedFinderInfo {
    pub icon_id: i16,
    unused: [u8;6],
    pub script: i8,
    pub xflags: i8,
    pub comment_id: i16,
    pub put_away: i32
}

#[derive(Clone,Copy,Debug,PartialEq)]
pub struct ExtendedKeyBlock {
    pub data_fork: ForkEntry,
    pub rsrc_fork: ForkEntry,
    pub finder_info: Option<FinderInfo>,
    pub ext_finder_info: Option<ExtendedFinderInfo>
}

/// Four character code as text, non-printing bytes are escaped
pub fn os_type_string(code: u32) -> String {
    crate::escaped_ascii_from_bytes(&code.to_be_bytes(),true,false)
}

impl ForkEntry {
    pub fn from_bytes(dat: &[u8]) -> Result<Self,Error> {
        if dat.len() != 8 {
            return Err(Error::InvalidArgument(format!("fork entry needs 8 bytes, got {}",dat.len())));
        }
        Ok(Self::read(&mut Cursor::new(dat))?)
    }
    /// Storage type of the fork, `None` if the byte has no assigned meaning
    pub fn storage_type(&self) -> Option<StorageType> {
        StorageType::from_u8(self.storage)
    }
    pub fn get_ptr(&self) -> u16 {
        self.key_ptr
    }
    pub fn blocks_used(&self) -> u16 {
        self.blocks_used
    }
    pub fn eof(&self) -> usize {
        u32::from_le_bytes([self.eof[0],self.eof[1],self.eof[2],0]) as usize
    }
    /// Only seedling, sapling, and tree forks can be read
    pub fn is_valid(&self) -> bool {
        match self.storage_type() {
            Some(stype) => stype.is_standard_file(),
            None => false
        }
    }
    pub fn is_empty(&self) -> bool {
        self.key_ptr==0 && self.eof()==0
    }
}

impl FinderInfo {
    pub fn type_string(&self) -> String {
        os_type_string(self.file_type)
    }
    pub fn creator_string(&self) -> String {
        os_type_string(self.creator)
    }
}

impl ExtendedKeyBlock {
    /// Decode a whole 512 byte block.  An unknown Finder info tag is a format error.
    pub fn from_bytes(dat: &[u8]) -> Result<Self,Error> {
        if dat.len() != BLOCK_SIZE {
            error!("extended key block needs {} bytes, got {}",BLOCK_SIZE,dat.len());
            return Err(Error::InvalidArgument(format!("extended key block needs {} bytes, got {}",BLOCK_SIZE,dat.len())));
        }
        let data_fork = ForkEntry::from_bytes(&dat[0..8])?;
        let rsrc_fork = ForkEntry::from_bytes(&dat[RSRC_FORK_OFFSET..RSRC_FORK_OFFSET+8])?;
        let mut finder_info = None;
        let mut ext_finder_info = None;
        let mut offset = FINDER_INFO_OFFSET;
        for _i in 0..2 {
            let size = dat[offset];
            let tag = dat[offset+1];
            if size != FINDER_ENTRY_SIZE {
                break;
            }
            let mut curs = Cursor::new(&dat[offset+2..offset+FINDER_ENTRY_SIZE as usize]);
            match tag {
                FINFO_TAG => finder_info = Some(FinderInfo::read(&mut curs)?),
                FXINFO_TAG => ext_finder_info = Some(ExtendedFinderInfo::read(&mut curs)?),
                _ => {
                    error!("unknown Finder info tag {} at offset {}",tag,offset);
                    return Err(Error::Format(format!("unknown Finder info tag {}",tag)));
                }
            }
            offset += FINDER_ENTRY_SIZE as usize;
        }
        debug!("extended key block: data fork eof {}, resource fork eof {}",data_fork.eof(),rsrc_fork.eof());
        Ok(Self {
            data_fork,
            rsrc_fork,
            finder_info,
            ext_finder_info
        })
    }
    /// put Finder info into JSON object, empty if there is none
    pub fn finder_to_json(&self) -> json::JsonValue {
        let mut ans = json::JsonValue::new_object();
        if let Some(finfo) = self.finder_info {
            ans["type"] = json::JsonValue::String(finfo.type_string());
            ans["creator"] = json::JsonValue::String(finfo.creator_string());
            ans["flags"] = json::JsonValue::String(hex::encode_upper(finfo.flags.to_be_bytes()));
        }
        if let Some(fxinfo) = self.ext_finder_info {
            ans["icon_id"] = json::JsonValue::Number(fxinfo.icon_id.into());
            ans["comment_id"] = json::JsonValue::Number(fxinfo.comment_id.into());
            ans["put_away"] = json::JsonValue::Number(fxinfo.put_away.into());
        }
        ans
    }
}

#[cfg(test)]
fn fork_bytes(stor: u8, key: u16, eof: u32) -> [u8;8] {
    let k = key.to_le_bytes();
    let e = eof.to_le_bytes();
    [stor,k[0],k[1],1,0,e[0],e[1],e[2]]
}

#[test]
fn forks_and_finder() {
    let mut blk = [0u8;BLOCK_SIZE];
    blk[0..8].copy_from_slice(&fork_bytes(1,7,100));
    blk[0x100..0x108].copy_from_slice(&fork_bytes(2,9,1000));
    blk[8] = 18;
    blk[9] = 1;
    blk[10..14].copy_from_slice(b"TEXT");
    blk[14..18].copy_from_slice(b"ttxt");
    blk[18..20].copy_from_slice(&0x0100u16.to_be_bytes());
    blk[20..22].copy_from_slice(&(-5i16).to_be_bytes());
    blk[0x1a] = 18;
    blk[0x1b] = 2;
    blk[0x1c..0x1e].copy_from_slice(&300i16.to_be_bytes());
    blk[0x28..0x2c].copy_from_slice(&(-2i32).to_be_bytes());
    let ekb = ExtendedKeyBlock::from_bytes(&blk).expect("decode failed");
    assert_eq!(ekb.data_fork.storage_type(),Some(StorageType::Seedling));
    assert_eq!(ekb.data_fork.get_ptr(),7);
    assert_eq!(ekb.data_fork.eof(),100);
    assert_eq!(ekb.rsrc_fork.storage_type(),Some(StorageType::Sapling));
    assert_eq!(ekb.rsrc_fork.eof(),1000);
    let finfo = ekb.finder_info.expect("no FInfo");
    assert_eq!(finfo.type_string(),"TEXT");
    assert_eq!(finfo.creator_string(),"ttxt");
    assert_eq!(finfo.flags,0x0100);
    assert_eq!(finfo.location_v,-5);
    let fxinfo = ekb.ext_finder_info.expect("no FXInfo");
    assert_eq!(fxinfo.icon_id,300);
    assert_eq!(fxinfo.put_away,-2);
}

#[test]
fn finder_scan_stops() {
    let mut blk = [0u8;BLOCK_SIZE];
    blk[8] = 17;
    blk[9] = 1;
    let ekb = ExtendedKeyBlock::from_bytes(&blk).expect("decode failed");
    assert_eq!(ekb.finder_info,None);
    assert!(ekb.data_fork.is_empty());
    assert!(!ekb.data_fork.is_valid());
}

#[test]
fn unknown_finder_tag() {
    let mut blk = [0u8;BLOCK_SIZE];
    blk[8] = 18;
    blk[9] = 3;
    match ExtendedKeyBlock::from_bytes(&blk) {
        Err(e) => assert_eq!(e.kind(),ErrorKind::Format),
        Ok(_) => panic!("tag 3 should be rejected")
    }
}
