//! # CLI Subcommands
//!
//! Contains modules that run the subcommands.

pub mod stat;
pub mod get;

use std::str::FromStr;
use std::fs::File;
use log::error;
use crate::fs::{self,VolumeExtent};
use crate::fs::prodos::Volume;
use crate::DYNERR;

#[derive(thiserror::Error,Debug)]
pub enum CommandError {
    #[error("Item type is unknown")]
    UnknownItemType,
    #[error("Command could not be interpreted")]
    InvalidCommand,
    #[error("One of the parameters was out of range")]
    OutOfRange,
    #[error("Item is not a file")]
    NotAFile
}

/// Kinds of items that can be pulled out of a volume
#[derive(PartialEq,Clone,Copy,Debug)]
pub enum ItemType {
    Data,
    Resource,
    Block
}

impl FromStr for ItemType {
    type Err = CommandError;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "data" => Ok(Self::Data),
            "rsrc" => Ok(Self::Resource),
            "block" => Ok(Self::Block),
            _ => Err(CommandError::UnknownItemType)
        }
    }
}

/// Open the image file named by `--dimg`.  If `--offset` is given the volume starts there,
/// otherwise the first volume that can be found is used.
pub fn open_volume<'a>(cmd: &clap::ArgMatches,file: &'a mut File) -> Result<Volume<&'a mut File>,DYNERR> {
    match cmd.get_one::<u64>("offset") {
        Some(offset) => {
            let extent = VolumeExtent { offset: *offset, length: None };
            Ok(Volume::open_extent(file,&extent)?)
        },
        None => fs::open_first_volume(file,None)
    }
}

/// Open the file named by `--dimg`, which is required by every subcommand
pub fn open_image(cmd: &clap::ArgMatches) -> Result<File,DYNERR> {
    let path = match cmd.get_one::<String>("dimg") {
        Some(p) => p,
        None => {
            error!("disk image path is missing");
            return Err(Box::new(CommandError::InvalidCommand));
        }
    };
    match File::open(path) {
        Ok(f) => Ok(f),
        Err(e) => {
            error!("could not open {}: {}",path,e);
            Err(Box::new(e))
        }
    }
}
