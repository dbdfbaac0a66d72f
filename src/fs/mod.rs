//! # File System Module
//!
//! File system modules handle interactions with directories and files.  At present
//! the only file system is ProDOS, with the GS/OS extensions, in `prodos`.
//!
//! An image may hold more than one volume, e.g., a hard disk image with an Apple
//! Partition Map.  Finding the volumes is the job of a `PartitionScanner`, which is
//! supplied from outside this crate.  Without one, the whole image is taken to be a
//! single volume.

pub mod prodos;

use std::io::{Read,Seek,SeekFrom};
use log::{debug,error};
use crate::DYNERR;

/// Enumerates volume location errors.  The `Display` trait will print equivalent long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("image is empty")]
    EmptyImage,
    #[error("no ProDOS volume was found in the image")]
    NoVolume
}

/// Location of one volume within a stream
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub struct VolumeExtent {
    /// byte offset of the volume's block 0
    pub offset: u64,
    /// length in bytes, `None` means run to the end of the stream
    pub length: Option<u64>
}

impl VolumeExtent {
    pub fn whole() -> Self {
        Self {
            offset: 0,
            length: None
        }
    }
}

/// Interface to a partition map decoder, e.g., for the Apple Partition Map.
/// Implementations return the extents of every partition that should hold a ProDOS volume.
pub trait PartitionScanner<R: Read + Seek> {
    fn scan(&self,stream: &mut R) -> Result<Vec<VolumeExtent>,DYNERR>;
}

/// Find the volumes in an image.  If there is no scanner, or the scanner finds
/// nothing, the answer is a single volume spanning the whole stream.
pub fn locate_volumes<R: Read + Seek>(stream: &mut R,scanner: Option<&dyn PartitionScanner<R>>) -> Result<Vec<VolumeExtent>,DYNERR> {
    if let Some(scanner) = scanner {
        let extents = scanner.scan(stream)?;
        if extents.len()>0 {
            debug!("partition scanner found {} volumes",extents.len());
            return Ok(extents);
        }
        debug!("partition scanner found nothing, using whole image");
    }
    Ok(vec![VolumeExtent::whole()])
}

/// Open the first volume that can be opened.  The stream is borrowed, so the caller keeps it.
pub fn open_first_volume<'a,R: Read + Seek>(stream: &'a mut R,scanner: Option<&dyn PartitionScanner<R>>) -> Result<prodos::Volume<&'a mut R>,DYNERR> {
    if stream.seek(SeekFrom::End(0))? == 0 {
        error!("image is empty");
        return Err(Box::new(Error::EmptyImage));
    }
    let extents = locate_volumes(stream,scanner)?;
    let mut found: Option<VolumeExtent> = None;
    for extent in extents {
        match prodos::Volume::open_extent(&mut *stream,&extent) {
            Ok(_) => {
                found = Some(extent);
                break;
            },
            Err(e) => debug!("no volume at offset {}: {}",extent.offset,e)
        }
    }
    match found {
        Some(extent) => Ok(prodos::Volume::open_extent(stream,&extent)?),
        None => {
            error!("no ProDOS volume was found in the image");
            Err(Box::new(Error::NoVolume))
        }
    }
}
