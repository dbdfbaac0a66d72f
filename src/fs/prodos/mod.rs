//! ## ProDOS file system module
//!
//! This reads one ProDOS volume out of any `Read + Seek` stream, including the GS/OS
//! extension for forked files.  The volume can start anywhere in the stream, so it works
//! with bare `.po` images as well as partitions of a larger image.
//!
//! * Read only
//! * Directory entries are plain values, file data is streamed into any `Write`
//! * Sparse files come back with their holes filled with zeros

pub mod types;
pub mod directory;
pub mod block;
pub mod bitmap;
pub mod forks;
pub mod files;
pub mod walk;

use std::io::{Read,Seek,SeekFrom,Write};
use colored::*;
use log::{info,debug,warn,error};
use types::*;
use directory::*;
use block::BlockDevice;
use bitmap::VolumeBitmap;
use forks::ExtendedKeyBlock;
use walk::{DirCursor,Entries};
use super::VolumeExtent;

pub const FS_NAME: &str = "prodos";
/// Nesting limit when walking the whole tree, a ProDOS pathname cannot go deeper than this
const MAX_DEPTH: usize = 32;

/// The primary interface for volume operations.
pub struct Volume<R: Read + Seek> {
    dev: BlockDevice<R>,
    header: VolDirHeader
}

impl<R: Read + Seek> Volume<R> {
    /// Open the volume that starts at the stream's current position and runs to the end of the stream.
    pub fn open(mut stream: R) -> Result<Self,Error> {
        let offset = stream.stream_position()?;
        let end = stream.seek(SeekFrom::End(0))?;
        Self::open_bounded(stream,offset,end.saturating_sub(offset))
    }
    /// Open the volume described by `extent`, typically found by a partition scanner.
    pub fn open_extent(mut stream: R,extent: &VolumeExtent) -> Result<Self,Error> {
        let end = stream.seek(SeekFrom::End(0))?;
        if extent.offset > end {
            error!("volume offset {} is past the end of the stream",extent.offset);
            return Err(Error::InvalidArgument(format!("volume offset {} is past the end of the stream",extent.offset)));
        }
        let avail = end - extent.offset;
        let len = match extent.length {
            Some(l) => u64::min(l,avail),
            None => avail
        };
        Self::open_bounded(stream,extent.offset,len)
    }
    fn open_bounded(stream: R,offset: u64,len: u64) -> Result<Self,Error> {
        let min = MIN_VOLUME_BLOCKS * BLOCK_SIZE as u64;
        let max = MAX_VOLUME_BLOCKS * BLOCK_SIZE as u64;
        if len < min || len > max {
            error!("{} bytes is not a plausible ProDOS volume size",len);
            return Err(Error::InvalidArgument(format!("volume size {} not in range {}..={}",len,min,max)));
        }
        let mut dev = BlockDevice::new(stream,offset,len);
        let key_block = dev.read_block(VOL_KEY_BLOCK)?;
        let header = VolDirHeader::from_bytes(&key_block[4..4+ENTRY_LEN])?;
        if header.entry_len() as usize != ENTRY_LEN {
            error!("unsupported directory entry length {}",header.entry_len());
            return Err(Error::InvalidArgument(format!("directory entry length {}",header.entry_len())));
        }
        dev.set_total_blocks(header.total_blocks());
        if (header.total_blocks() as u64) * (BLOCK_SIZE as u64) > len {
            warn!("volume declares {} blocks, stream holds {}, missing blocks will read as zeros",
                header.total_blocks(),len / BLOCK_SIZE as u64);
        }
        info!("opened volume {} at offset {}, {} blocks",header.name(),offset,header.total_blocks());
        Ok(Self {
            dev,
            header
        })
    }
    pub(crate) fn device(&mut self) -> &mut BlockDevice<R> {
        &mut self.dev
    }
    /// Give back the stream
    pub fn into_inner(self) -> R {
        self.dev.into_inner()
    }
    pub fn directory_header(&self) -> &VolDirHeader {
        &self.header
    }
    pub fn total_blocks(&self) -> u16 {
        self.header.total_blocks()
    }
    /// Byte offset of the volume within the stream
    pub fn offset(&self) -> u64 {
        self.dev.offset()
    }
    pub fn read_raw_block(&mut self,iblock: u16) -> Result<[u8;BLOCK_SIZE],Error> {
        self.dev.read_block(iblock)
    }
    /// Detached cursor over the volume directory
    pub fn root_cursor(&self) -> DirCursor {
        DirCursor::new(VOL_KEY_BLOCK,self.header.file_count())
    }
    /// Iterate over the live entries of the volume directory
    pub fn enumerate_root(&mut self) -> Entries<'_,R> {
        let cursor = self.root_cursor();
        Entries::new(self,cursor)
    }
    fn require_dir(&self,entry: &Entry) -> Result<(),Error> {
        if !entry.is_dir() {
            error!("{} is not a subdirectory",entry.name());
            return Err(Error::InvalidArgument(format!("{} is not a subdirectory",entry.name())));
        }
        Ok(())
    }
    pub fn subdirectory_header(&mut self,entry: &Entry) -> Result<SubDirHeader,Error> {
        self.require_dir(entry)?;
        let buf = self.dev.read_block(entry.get_ptr())?;
        SubDirHeader::from_bytes(&buf[4..4+ENTRY_LEN])
    }
    /// Detached cursor over a subdirectory, fails if `entry` is not a subdirectory
    pub fn subdir_cursor(&mut self,entry: &Entry) -> Result<DirCursor,Error> {
        let header = self.subdirectory_header(entry)?;
        Ok(DirCursor::new(entry.get_ptr(),header.file_count()))
    }
    /// Iterate over the live entries of a subdirectory, fails if `entry` is not a subdirectory
    pub fn enumerate_subdirectory(&mut self,entry: &Entry) -> Result<Entries<'_,R>,Error> {
        let cursor = self.subdir_cursor(entry)?;
        Ok(Entries::new(self,cursor))
    }
    /// Write the file's data to `sink`, returning the byte count.
    /// For a forked file this is the data fork.
    pub fn write_file_data<W: Write>(&mut self,entry: &Entry,sink: &mut W) -> Result<usize,Error> {
        files::write_file(&mut self.dev,entry.storage_type(),entry.storage_nibble(),entry.get_ptr(),entry.eof(),&entry.name(),sink)
    }
    pub fn get_file_data(&mut self,entry: &Entry) -> Result<Vec<u8>,Error> {
        let mut ans = Vec::new();
        self.write_file_data(entry,&mut ans)?;
        Ok(ans)
    }
    /// Decode the extended key block, fails if `entry` is not a forked file
    pub fn get_extended_key_block(&mut self,entry: &Entry) -> Result<ExtendedKeyBlock,Error> {
        if entry.storage_type() != Some(StorageType::GSOSForkedFile) {
            error!("{} is not a forked file",entry.name());
            return Err(Error::InvalidArgument(format!("{} is not a forked file",entry.name())));
        }
        files::read_extended_key_block(&mut self.dev,entry.get_ptr())
    }
    pub fn write_data_fork<W: Write>(&mut self,entry: &Entry,sink: &mut W) -> Result<usize,Error> {
        let ekb = self.get_extended_key_block(entry)?;
        files::write_fork(&mut self.dev,&ekb.data_fork,sink)
    }
    pub fn get_data_fork(&mut self,entry: &Entry) -> Result<Vec<u8>,Error> {
        let mut ans = Vec::new();
        self.write_data_fork(entry,&mut ans)?;
        Ok(ans)
    }
    pub fn write_resource_fork<W: Write>(&mut self,entry: &Entry,sink: &mut W) -> Result<usize,Error> {
        let ekb = self.get_extended_key_block(entry)?;
        files::write_fork(&mut self.dev,&ekb.rsrc_fork,sink)
    }
    pub fn get_resource_fork(&mut self,entry: &Entry) -> Result<Vec<u8>,Error> {
        let mut ans = Vec::new();
        self.write_resource_fork(entry,&mut ans)?;
        Ok(ans)
    }
    /// Read the bitmap blocks and decode them
    pub fn get_block_allocation_bitmap(&mut self) -> Result<VolumeBitmap,Error> {
        let total = self.header.total_blocks();
        let start = self.header.bitmap_ptr();
        let mut raw = Vec::new();
        for i in 0..bitmap::bitmap_block_count(total) {
            let iblock = start as usize + i;
            if iblock > u16::MAX as usize {
                error!("bitmap runs past block 65535");
                return Err(Error::Format("bitmap runs past block 65535".to_string()));
            }
            raw.extend_from_slice(&self.dev.read_block(iblock as u16)?);
        }
        Ok(VolumeBitmap::new(raw,total))
    }
    /// Find an entry by path.  Names are matched without regard to case,
    /// a leading slash means the first node is the volume name.
    pub fn find_entry(&mut self,path: &str) -> Result<Entry,Error> {
        let nodes = self.normalize_path(path)?;
        if nodes.is_empty() {
            return Err(Error::PathNotFound(format!("{} is the volume itself",path)));
        }
        let mut cursor = self.root_cursor();
        for (level,node) in nodes.iter().enumerate() {
            let mut found: Option<Entry> = None;
            while let Some(maybe_entry) = cursor.next(self) {
                let entry = maybe_entry?;
                if entry.name().to_uppercase()==*node {
                    found = Some(entry);
                    break;
                }
            }
            match found {
                Some(entry) if level+1==nodes.len() => return Ok(entry),
                Some(entry) if entry.is_dir() => cursor = self.subdir_cursor(&entry)?,
                _ => break
            }
        }
        Err(Error::PathNotFound(path.to_string()))
    }
    /// Put path as [dir,dir,...,last], relative to the volume directory, in upper case
    fn normalize_path(&self,path: &str) -> Result<Vec<String>,Error> {
        let mut nodes: Vec<String> = path.split('/').filter(|s| s.len()>0).map(|s| s.to_uppercase()).collect();
        if path.starts_with('/') && nodes.len()>0 {
            if nodes[0] != self.header.name().to_uppercase() {
                return Err(Error::PathNotFound(path.to_string()));
            }
            nodes.remove(0);
        }
        for node in nodes.iter() {
            if !is_name_valid(node) {
                error!("invalid ProDOS name {}",node);
                return Err(Error::InvalidArgument(format!("invalid ProDOS name {}",node)));
            }
        }
        Ok(nodes)
    }
    /// Cursor and display name for the directory at `path`
    fn find_dir(&mut self,path: &str) -> Result<(String,DirCursor),Error> {
        if self.normalize_path(path)?.is_empty() {
            return Ok(("/".to_string() + &self.header.name(),self.root_cursor()));
        }
        let entry = self.find_entry(path)?;
        let cursor = self.subdir_cursor(&entry)?;
        Ok((entry.name(),cursor))
    }
    /// Output directory as a JSON object, calls itself recursively
    fn tree_node(&mut self,mut cursor: DirCursor,include_meta: bool,depth: usize) -> Result<json::JsonValue,Error> {
        if depth > MAX_DEPTH {
            error!("directories nested more than {} deep",MAX_DEPTH);
            return Err(Error::Format(format!("directories nested more than {} deep",MAX_DEPTH)));
        }
        let mut files = json::JsonValue::new_object();
        while let Some(maybe_entry) = cursor.next(self) {
            let entry = maybe_entry?;
            let key = entry.name();
            files[&key] = json::JsonValue::new_object();
            if entry.is_dir() {
                debug!("descend into directory {}",key);
                let sub = self.subdir_cursor(&entry)?;
                files[&key]["files"] = self.tree_node(sub,include_meta,depth+1)?;
            }
            if include_meta {
                files[&key]["meta"] = entry.meta_to_json();
                if entry.storage_type()==Some(StorageType::GSOSForkedFile) {
                    match self.get_extended_key_block(&entry) {
                        Ok(ekb) => {
                            files[&key]["meta"]["data_eof"] = json::JsonValue::Number(ekb.data_fork.eof().into());
                            files[&key]["meta"]["rsrc_eof"] = json::JsonValue::Number(ekb.rsrc_fork.eof().into());
                            files[&key]["meta"]["finder"] = ekb.finder_to_json();
                        },
                        Err(e) => warn!("skipping fork info for {}: {}",key,e)
                    }
                }
            }
        }
        Ok(files)
    }
    /// Whole directory tree as a JSON string, `indent` of `None` minifies
    pub fn tree(&mut self,include_meta: bool,indent: Option<u16>) -> Result<String,Error> {
        let cursor = self.root_cursor();
        let mut tree = json::JsonValue::new_object();
        tree["file_system"] = json::JsonValue::String(FS_NAME.to_string());
        tree["files"] = self.tree_node(cursor,include_meta,0)?;
        tree["label"] = json::JsonValue::new_object();
        tree["label"]["name"] = json::JsonValue::String(self.header.name());
        Ok(match indent {
            Some(spaces) => json::stringify_pretty(tree,spaces),
            None => json::stringify(tree)
        })
    }
    /// Volume statistics as a JSON string
    pub fn stat(&mut self,indent: Option<u16>) -> Result<String,Error> {
        let bitmap = self.get_block_allocation_bitmap()?;
        let mut ans = json::JsonValue::new_object();
        ans["file_system"] = json::JsonValue::String(FS_NAME.to_string());
        ans["offset"] = json::JsonValue::Number(self.offset().into());
        ans["header"] = self.header.to_json();
        ans["free_blocks"] = json::JsonValue::Number(bitmap.free_block_count().into());
        ans["used_blocks"] = json::JsonValue::Number(bitmap.used_block_count().into());
        Ok(match indent {
            Some(spaces) => json::stringify_pretty(ans,spaces),
            None => json::stringify(ans)
        })
    }
    /// Catalog rows for the directory at `path`, one `Entry` display string per row
    pub fn catalog_to_vec(&mut self,path: &str) -> Result<Vec<String>,Error> {
        let (_name,mut cursor) = self.find_dir(path)?;
        let mut ans = Vec::new();
        while let Some(maybe_entry) = cursor.next(self) {
            ans.push(maybe_entry?.to_string());
        }
        Ok(ans)
    }
    pub fn catalog_to_stdout(&mut self,path: &str) -> Result<(),Error> {
        let (name,mut cursor) = self.find_dir(path)?;
        let mut rows = Vec::new();
        while let Some(maybe_entry) = cursor.next(self) {
            rows.push(maybe_entry?);
        }
        println!();
        println!("{}",name.bright_blue().bold());
        println!();
        println!(" {:15} {:4} {:6} {:16} {:16} {:7} {:7}",
            "NAME".bold(),"TYPE".bold(),"BLOCKS".bold(),
            "MODIFIED".bold(),"CREATED".bold(),"ENDFILE".bold(),"SUBTYPE".bold());
        println!();
        for row in rows {
            println!("{}",row);
        }
        println!();
        let bitmap = self.get_block_allocation_bitmap()?;
        println!("BLOCKS FREE: {}  BLOCKS USED: {}  TOTAL BLOCKS: {}",
            bitmap.free_block_count(),bitmap.used_block_count(),self.total_blocks());
        println!();
        Ok(())
    }
}

#[test]
fn test_path_normalize() {
    let mut img = vec![0;280*BLOCK_SIZE];
    let key = 2*BLOCK_SIZE;
    img[key+4] = 0xf8;
    img[key+5..key+13].copy_from_slice(b"NEW.DISK");
    img[key+0x23] = 0x27;
    img[key+0x24] = 0x0d;
    img[key+0x29..key+0x2b].copy_from_slice(&280u16.to_le_bytes());
    let vol = Volume::open(std::io::Cursor::new(img)).expect("open failed");
    assert_eq!(vol.normalize_path("DIR1").expect("bad path"),["DIR1"]);
    assert_eq!(vol.normalize_path("dir1/").expect("bad path"),["DIR1"]);
    assert_eq!(vol.normalize_path("dir1/sub2").expect("bad path"),["DIR1","SUB2"]);
    assert_eq!(vol.normalize_path("/new.disk/dir1/sub2").expect("bad path"),["DIR1","SUB2"]);
    assert!(vol.normalize_path("/new.disk").expect("bad path").is_empty());
    match vol.normalize_path("/old.disk/dir1") {
        Err(e) => assert_eq!(e.to_string(),"PATH NOT FOUND: /old.disk/dir1"),
        Ok(_) => panic!("wrong volume name should fail")
    }
    match vol.normalize_path("dir1/1bad") {
        Err(e) => assert_eq!(e.kind(),ErrorKind::InvalidArgument),
        Ok(_) => panic!("invalid name should fail")
    }
}
