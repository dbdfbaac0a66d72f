
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use thiserror::Error;

pub const BLOCK_SIZE: usize = 512;
pub const VOL_KEY_BLOCK: u16 = 2;
/// Only entry length this reader understands
pub const ENTRY_LEN: usize = 0x27;
pub const MIN_VOLUME_BLOCKS: u64 = 5;
pub const MAX_VOLUME_BLOCKS: u64 = 65535;
/// Largest EOF an index block can address
pub const SAPLING_MAX_EOF: usize = 256 * BLOCK_SIZE;
/// Largest EOF a master index block can address
pub const TREE_MAX_EOF: usize = 256 * 256 * BLOCK_SIZE;

/// Broad classification of errors, useful for callers that want to branch
/// without matching every variant.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum ErrorKind {
    InvalidArgument,
    Format,
    Io,
    Unsupported
}

#[derive(Error,Debug)]
pub enum Error {
    #[error("INVALID ARGUMENT: {0}")]
    InvalidArgument(String),
    #[error("FORMAT ERROR: {0}")]
    Format(String),
    #[error("BLOCK {block} OUT OF BOUNDS, VOLUME HAS {total} BLOCKS")]
    OutOfBounds { block: u16, total: u16 },
    #[error("SHORT READ AT BLOCK {0}")]
    ShortRead(u16),
    #[error("READ FAILED AT BLOCK {block}: {source}")]
    ReadFailed { block: u16, source: std::io::Error },
    #[error("I/O ERROR: {0}")]
    Io(#[from] std::io::Error),
    #[error("UNSUPPORTED STORAGE TYPE ${stype:02X} FOR {name}")]
    Unsupported { stype: u8, name: String },
    #[error("PATH NOT FOUND: {0}")]
    PathNotFound(String)
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) | Self::PathNotFound(_) => ErrorKind::InvalidArgument,
            Self::Format(_) => ErrorKind::Format,
            Self::OutOfBounds {..} | Self::ShortRead(_) | Self::ReadFailed {..} | Self::Io(_) => ErrorKind::Io,
            Self::Unsupported {..} => ErrorKind::Unsupported
        }
    }
}

impl From<binrw::Error> for Error {
    fn from(e: binrw::Error) -> Self {
        match e {
            binrw::Error::Io(io) => Self::Io(io),
            other => Self::InvalidArgument(other.to_string())
        }
    }
}

/// Map file type codes to strings for display
pub const TYPE_MAP_DISP: &[(u8,&str)] = &[
    (0x00, "???"),
    (0x01, "BAD"),
    (0x02, "PCD"), // Pascal code
    (0x03, "PTX"), // Pascal text
    (0x04, "TXT"),
    (0x05, "PDA"), // Pascal data
    (0x06, "BIN"),
    (0x07, "FNT"), // SOS
    (0x08, "FOT"), // Photo
    (0x09, "BA3"), // SOS
    (0x0a, "DA3"), // SOS
    (0x0b, "WPF"), // SOS
    (0x0c, "SOS"), // SOS
    (0x0f, "DIR"),
    (0x10, "RPD"), // SOS
    (0x11, "RPI"), // SOS
    (0x12, "AFD"), // SOS
    (0x13, "AFM"), // SOS
    (0x14, "AFR"), // SOS
    (0x15, "SCL"), // SOS
    (0x16, "PFS"),
    (0x19, "ADB"), // AppleWorks Data Base
    (0x1a, "AWP"), // AppleWorks Word Processor
    (0x1b, "ASP"), // AppleWorks Spreadsheet
    (0x20, "TDM"),
    (0x21, "IPS"),
    (0x22, "UPV"),
    (0x29, "3SD"),
    (0x2a, "8SC"),
    (0x2b, "8OB"),
    (0x2c, "8IC"),
    (0x2d, "8LD"),
    (0x2e, "P8C"),
    (0x41, "OCR"),
    (0x42, "FTD"),
    (0x50, "GWP"),
    (0x51, "GSS"),
    (0x52, "GDB"),
    (0x53, "DRW"),
    (0x54, "GDP"),
    (0x55, "HMD"),
    (0x56, "EDU"),
    (0x57, "STN"),
    (0x58, "HLP"),
    (0x59, "COM"),
    (0x5a, "CFG"),
    (0x5b, "ANM"),
    (0x5c, "MUM"),
    (0x5d, "ENT"),
    (0x5e, "DVU"),
    (0x60, "PRE"),
    (0x6b, "BIO"),
    (0x6d, "DVR"),
    (0x6e, "PRE"),
    (0x6f, "HDV"),
    (0x80, "GES"), // GEOS
    (0x81, "GEA"),
    (0x82, "GEO"),
    (0x83, "GED"),
    (0x84, "GEF"),
    (0x85, "GEP"),
    (0x86, "GEI"),
    (0x87, "GEX"),
    (0x89, "GEV"),
    (0x8b, "GEC"),
    (0x8c, "GEK"),
    (0x8d, "GEW"),
    (0xa0, "WP "),
    (0xab, "GSB"), // GS BASIC
    (0xac, "TDF"),
    (0xad, "BDF"),
    (0xb0, "SRC"), // GS/OS from here on
    (0xb1, "OBJ"),
    (0xb2, "LIB"),
    (0xb3, "S16"),
    (0xb4, "RTL"),
    (0xb5, "EXE"),
    (0xb6, "PIF"),
    (0xb7, "TIF"),
    (0xb8, "NDA"),
    (0xb9, "CDA"),
    (0xba, "TOL"),
    (0xbb, "DVR"),
    (0xbc, "LDF"),
    (0xbd, "FST"),
    (0xbf, "DOC"),
    (0xc0, "PNT"),
    (0xc1, "PIC"),
    (0xc2, "ANI"),
    (0xc3, "PAL"),
    (0xc5, "OOG"),
    (0xc6, "SCR"),
    (0xc7, "CDV"),
    (0xc8, "FON"),
    (0xc9, "FND"),
    (0xca, "ICN"),
    (0xd5, "MUS"),
    (0xd6, "INS"),
    (0xd7, "MDI"),
    (0xd8, "SND"),
    (0xd9, "DBM"),
    (0xe0, "LBR"),
    (0xe2, "ATK"),
    (0xee, "R16"),
    (0xef, "PAS"), // Pascal area
    (0xf0, "CMD"),
    (0xf1, "USR"),
    (0xf2, "USR"),
    (0xf3, "USR"),
    (0xf4, "USR"),
    (0xf5, "USR"),
    (0xf6, "USR"),
    (0xf7, "USR"),
    (0xf8, "USR"),
    (0xf9, "P16"),
    (0xfa, "INT"),
    (0xfb, "IVR"),
    (0xfc, "BAS"),
    (0xfd, "VAR"),
    (0xfe, "REL"),
    (0xff, "SYS")
];

/// Three letter mnemonic for a file type, or `$XX` if there is none
pub fn file_type_name(ftype: u8) -> String {
    match TYPE_MAP_DISP.iter().find(|(code,_)| *code==ftype) {
        Some((_,s)) => s.to_string(),
        None => "$".to_string() + &hex::encode_upper(vec![ftype])
    }
}

/// Enumerates a subset of ProDOS file types, convert with `as u8`.
#[derive(Clone,Copy,PartialEq,Debug)]
pub enum FileType {
    None = 0x00,
    Text = 0x04,
    Binary = 0x06,
    Directory = 0x0f,
    GSApplication = 0xb3,
    PascalArea = 0xef,
    GSSystem = 0xf9,
    ApplesoftCode = 0xfc,
    System = 0xff
}

/// Storage type, found in the high nibble of the first byte of any entry or header.
#[derive(Clone,Copy,FromPrimitive,PartialEq,Eq,Debug)]
pub enum StorageType {
    Inactive = 0x00,
    Seedling = 0x01,
    Sapling = 0x02,
    Tree = 0x03,
    PascalArea = 0x04,
    GSOSForkedFile = 0x05,
    SubDirEntry = 0x0d,
    SubDirHeader = 0x0e,
    VolDirHeader = 0x0f
}

impl StorageType {
    /// Decode the high nibble of `stor_len_nibs`, `None` means the nibble has no assigned meaning.
    pub fn from_nibs(stor_len_nibs: u8) -> Option<Self> {
        Self::from_u8(stor_len_nibs >> 4)
    }
    /// True for the storage types that are reached through a key block and index blocks
    pub fn is_standard_file(&self) -> bool {
        matches!(self, Self::Seedling | Self::Sapling | Self::Tree)
    }
}

#[derive(Clone,Copy,Debug)]
pub enum Access {
    Read = 0x01,
    Write = 0x02,
    Invisible = 0x04,
    Backup = 0x20,
    Rename = 0x40,
    Destroy = 0x80
}

/// Decoded access byte, returned by the directory structures.
#[derive(Clone,Copy,PartialEq,Eq,Debug,Default)]
pub struct AccessFlags(pub u8);

impl AccessFlags {
    pub fn get(&self,what: Access) -> bool {
        self.0 & what as u8 > 0
    }
    /// Short form as in `RWIBND`, with `-` for each flag that is clear
    pub fn to_flag_string(&self) -> String {
        [(Access::Read,'R'),(Access::Write,'W'),(Access::Invisible,'I'),
            (Access::Backup,'B'),(Access::Rename,'N'),(Access::Destroy,'D')]
            .iter()
            .map(|(a,c)| if self.get(*a) { *c } else { '-' })
            .collect()
    }
}

#[test]
fn type_names() {
    assert_eq!(file_type_name(0x04),"TXT");
    assert_eq!(file_type_name(0xb3),"S16");
    assert_eq!(file_type_name(0x9a),"$9A");
}

#[test]
fn storage_nibbles() {
    assert_eq!(StorageType::from_nibs(0x2b),Some(StorageType::Sapling));
    assert_eq!(StorageType::from_nibs(0x58),Some(StorageType::GSOSForkedFile));
    assert_eq!(StorageType::from_nibs(0x71),None);
    assert!(StorageType::Tree.is_standard_file());
    assert!(!StorageType::SubDirEntry.is_standard_file());
}

#[test]
fn access_string() {
    assert_eq!(AccessFlags(0xe3).to_flag_string(),"RW-BND");
    assert_eq!(AccessFlags(0x05).to_flag_string(),"R-I---");
}
