//! ### ProDOS directory structures
//!
//! Fixed length structures decoded with `binrw`.  Each decoder takes a slice of exactly
//! the structure's length, checks the storage type discriminant, and only then exposes
//! the fields.  Everything here is a plain `Copy` value; nothing borrows the volume.

use std::fmt;
use std::io::Cursor;
use binrw::BinRead;
use colored::*;
use log::{warn,error};
use regex::Regex;
use super::types::*;

/// Date format used in JSON output
const JSON_DATE_FMT: &str = "%Y/%m/%d %H:%M";

/// Decode a ProDOS date/time.  A raw value of zero, or a value that does not form
/// a calendar date, gives `None`.
pub fn unpack_time(prodos_date_time: [u8;4]) -> Option<chrono::NaiveDateTime> {
    if prodos_date_time == [0;4] {
        return None;
    }
    let date = u16::from_le_bytes([prodos_date_time[0],prodos_date_time[1]]);
    let time = u16::from_le_bytes([prodos_date_time[2],prodos_date_time[3]]);
    let mut year = (date >> 9) & 0x7f;
    // 1940 through 2039
    if year < 40 {
        year += 100;
    }
    let month = (date >> 5) & 0x0f;
    let day = date & 0x1f;
    let hour = (time >> 8) & 0x1f;
    let minute = time & 0x3f;
    match chrono::NaiveDate::from_ymd_opt(1900 + year as i32,month as u32,day as u32) {
        Some(date) => date.and_hms_opt(hour as u32,minute as u32,0),
        None => None
    }
}

fn time_string(prodos_date_time: [u8;4], fmt: &str, missing: &str) -> String {
    match unpack_time(prodos_date_time) {
        Some(date_time) => date_time.format(fmt).to_string(),
        None => missing.to_string()
    }
}

/// Test the string for validity as a ProDOS name.
pub fn is_name_valid(s: &str) -> bool {
    match Regex::new(r"^[A-Z][A-Z0-9.]{0,14}$") {
        Ok(fname_patt) => fname_patt.is_match(&s.to_uppercase()),
        Err(_) => false
    }
}

/// Convert filename bytes to a string.  Will not panic, will escape the string if necessary.
/// Must pass the stor_len_nibs field into nibs.
fn file_name_to_string(nibs: u8, fname: &[u8;15]) -> String {
    let name_len = (nibs & 0x0f) as usize;
    let raw = &fname[0..name_len];
    if raw.iter().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        return String::from_utf8_lossy(raw).to_string();
    }
    warn!("continuing with invalid filename");
    crate::escaped_ascii_from_bytes(raw, true, false)
}

/// Verify a slice has the right length and the expected storage type, then decode it.
fn decode<T>(what: &str, dat: &[u8], len: usize, expected: Option<StorageType>) -> Result<T,Error>
where T: for<'a> BinRead<Args<'a> = ()> + binrw::meta::ReadEndian {
    if dat.len() != len {
        error!("{} needs {} bytes, got {}",what,len,dat.len());
        return Err(Error::InvalidArgument(format!("{} needs {} bytes, got {}",what,len,dat.len())));
    }
    if let Some(stype) = expected {
        if dat[0] >> 4 != stype as u8 {
            error!("{} has storage type ${:X}, expected ${:X}",what,dat[0] >> 4,stype as u8);
            return Err(Error::InvalidArgument(format!("{} has storage type ${:X}",what,dat[0] >> 4)));
        }
    }
    Ok(T::read(&mut Cursor::new(dat))?)
}

pub trait HasName {
    fn fname(&self) -> (u8,[u8;15]);
    /// Length of the name, from the low nibble of the first byte
    fn name_len(&self) -> usize {
        (self.fname().0 & 0x0f) as usize
    }
    fn name(&self) -> String;
    fn storage_type(&self) -> Option<StorageType>;
}

// Block   | Contents
// -----------------------------
// 0       | Loader
// 1       | Loader
// 2       | Volume Directory Key
// 3 - n   | Volume Directory
// n+1 - p | Volume Bitmap

#[derive(BinRead,Clone,Copy,Debug,PartialEq)]
#[br(little)]
pub struct VolDirHeader {
    stor_len_nibs: u8,
    name: [u8;15],
    reserved: [u8;2],
    last_mod: [u8;4],
    lowercase_flags: u16,
    create_time: [u8;4],
    vers: u8,
    min_vers: u8,
    access: u8,
    entry_len: u8,
    entries_per_block: u8,
    file_count: u16,
    bitmap_ptr: u16,
    total_blocks: u16
}

#[derive(BinRead,Clone,Copy,Debug,PartialEq)]
#[br(little)]
pub struct SubDirHeader {
    stor_len_nibs: u8,
    name: [u8;15],
    reserved: [u8;8],
    create_time: [u8;4],
    vers: u8,
    min_vers: u8,
    access: u8,
    entry_len: u8,
    entries_per_block: u8,
    file_count: u16,
    parent_ptr: u16,
    parent_entry_num: u8,
    parent_entry_len: u8
}

#[derive(BinRead,Clone,Copy,Debug,PartialEq)]
#[br(little)]
pub struct Entry {
    stor_len_nibs: u8,
    name: [u8;15],
    file_type: u8,
    key_ptr: u16,
    blocks_used: u16,
    eof: [u8;3],
    create_time: [u8;4],
    vers: u8,
    min_vers: u8,
    access: u8,
    aux_type: u16,
    last_mod: [u8;4],
    header_ptr: u16
}

impl VolDirHeader {
    /// Decode from exactly 39 bytes, storage type must be $F
    pub fn from_bytes(dat: &[u8]) -> Result<Self,Error> {
        decode("volume directory header",dat,ENTRY_LEN,Some(StorageType::VolDirHeader))
    }
    pub fn total_blocks(&self) -> u16 {
        self.total_blocks
    }
    pub fn bitmap_ptr(&self) -> u16 {
        self.bitmap_ptr
    }
    pub fn file_count(&self) -> u16 {
        self.file_count
    }
    pub fn entry_len(&self) -> u8 {
        self.entry_len
    }
    pub fn entries_per_block(&self) -> u8 {
        self.entries_per_block
    }
    pub fn version(&self) -> (u8,u8) {
        (self.vers,self.min_vers)
    }
    pub fn access(&self) -> AccessFlags {
        AccessFlags(self.access)
    }
    pub fn created(&self) -> Option<chrono::NaiveDateTime> {
        unpack_time(self.create_time)
    }
    /// Only meaningful on volumes written by GS/OS
    pub fn modified(&self) -> Option<chrono::NaiveDateTime> {
        unpack_time(self.last_mod)
    }
    pub fn lowercase_flags(&self) -> u16 {
        self.lowercase_flags
    }
    /// GS/OS marks the lowercase flags as valid by setting bit 15
    pub fn has_lowercase(&self) -> bool {
        self.lowercase_flags & 0x8000 > 0
    }
    pub fn is_lowercase(&self,idx: usize) -> bool {
        self.has_lowercase() && idx < 15 && self.lowercase_flags & (1 << idx) > 0
    }
    /// put header fields into JSON object, intended for use with STAT
    pub fn to_json(&self) -> json::JsonValue {
        let mut ans = json::JsonValue::new_object();
        let (vers,min_vers) = self.version();
        ans["name"] = json::JsonValue::String(self.name());
        ans["total_blocks"] = json::JsonValue::Number(self.total_blocks.into());
        ans["bitmap_ptr"] = json::JsonValue::Number(self.bitmap_ptr.into());
        ans["file_count"] = json::JsonValue::Number(self.file_count.into());
        ans["entry_len"] = json::JsonValue::Number(self.entry_len.into());
        ans["entries_per_block"] = json::JsonValue::Number(self.entries_per_block.into());
        ans["access"] = json::JsonValue::String(self.access().to_flag_string());
        ans["version"] = json::JsonValue::Number(vers.into());
        ans["min_version"] = json::JsonValue::Number(min_vers.into());
        ans["time_created"] = json::JsonValue::String(time_string(self.create_time,JSON_DATE_FMT,""));
        ans["time_modified"] = json::JsonValue::String(time_string(self.last_mod,JSON_DATE_FMT,""));
        ans["lowercase_flags"] = json::JsonValue::String(hex::encode_upper(self.lowercase_flags.to_be_bytes()));
        ans
    }
}

impl SubDirHeader {
    /// Decode from exactly 39 bytes, storage type must be $E
    pub fn from_bytes(dat: &[u8]) -> Result<Self,Error> {
        decode("subdirectory header",dat,ENTRY_LEN,Some(StorageType::SubDirHeader))
    }
    pub fn file_count(&self) -> u16 {
        self.file_count
    }
    pub fn entry_len(&self) -> u8 {
        self.entry_len
    }
    pub fn entries_per_block(&self) -> u8 {
        self.entries_per_block
    }
    pub fn access(&self) -> AccessFlags {
        AccessFlags(self.access)
    }
    pub fn created(&self) -> Option<chrono::NaiveDateTime> {
        unpack_time(self.create_time)
    }
    pub fn version(&self) -> (u8,u8) {
        (self.vers,self.min_vers)
    }
    /// Block containing the entry that points to this directory
    pub fn parent_ptr(&self) -> u16 {
        self.parent_ptr
    }
    /// Index of the parent entry within the parent block, and the parent's entry length
    pub fn parent_entry(&self) -> (u8,u8) {
        (self.parent_entry_num,self.parent_entry_len)
    }
}

impl Entry {
    /// Decode from exactly 39 bytes.  No discriminant check, any storage type is accepted.
    pub fn from_bytes(dat: &[u8]) -> Result<Self,Error> {
        decode("directory entry",dat,ENTRY_LEN,None)
    }
    pub fn is_active(&self) -> bool {
        self.stor_len_nibs >> 4 > 0
    }
    /// Raw storage type nibble, useful when the nibble has no assigned meaning
    pub fn storage_nibble(&self) -> u8 {
        self.stor_len_nibs >> 4
    }
    pub fn get_ptr(&self) -> u16 {
        self.key_ptr
    }
    pub fn header_ptr(&self) -> u16 {
        self.header_ptr
    }
    pub fn blocks_used(&self) -> u16 {
        self.blocks_used
    }
    pub fn eof(&self) -> usize {
        u32::from_le_bytes([self.eof[0],self.eof[1],self.eof[2],0]) as usize
    }
    pub fn aux(&self) -> u16 {
        self.aux_type
    }
    pub fn ftype(&self) -> u8 {
        self.file_type
    }
    pub fn version(&self) -> (u8,u8) {
        (self.vers,self.min_vers)
    }
    pub fn get_access(&self,what: Access) -> bool {
        AccessFlags(self.access).get(what)
    }
    pub fn access(&self) -> AccessFlags {
        AccessFlags(self.access)
    }
    pub fn created(&self) -> Option<chrono::NaiveDateTime> {
        unpack_time(self.create_time)
    }
    pub fn modified(&self) -> Option<chrono::NaiveDateTime> {
        unpack_time(self.last_mod)
    }
    pub fn is_dir(&self) -> bool {
        self.storage_type()==Some(StorageType::SubDirEntry)
    }
    /// put metadata into JSON object, intended for use with TREE
    pub fn meta_to_json(&self) -> json::JsonValue {
        let mut meta = json::JsonValue::new_object();
        meta["type"] = json::JsonValue::String(hex::encode_upper(vec![self.file_type]));
        meta["aux"] = json::JsonValue::String(hex::encode_upper(self.aux_type.to_be_bytes()));
        meta["storage"] = json::JsonValue::String(hex::encode_upper(vec![self.storage_nibble()]));
        meta["eof"] = json::JsonValue::Number(self.eof().into());
        meta["time_created"] = json::JsonValue::String(time_string(self.create_time,JSON_DATE_FMT,""));
        meta["time_modified"] = json::JsonValue::String(time_string(self.last_mod,JSON_DATE_FMT,""));
        meta["read_only"] = json::JsonValue::Boolean(!self.get_access(Access::Write));
        meta["invisible"] = json::JsonValue::Boolean(self.get_access(Access::Invisible));
        meta["system"] = json::JsonValue::Boolean(self.file_type==FileType::System as u8);
        meta["blocks"] = json::JsonValue::Number(self.blocks_used.into());
        meta
    }
}

/// Allows the entry to be displayed to the console using `println!`.  This also
/// derives `to_string`, so the structure can be converted to `String`.
/// Intended use is for CATALOG.
impl fmt::Display for Entry {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const DATE_FMT: &str = "%d-%b-%y %H:%M";
        let create_time = time_string(self.create_time,DATE_FMT,"<NO DATE>");
        let mod_time = time_string(self.last_mod,DATE_FMT,"<NO DATE>");
        let write_protect = match self.get_access(Access::Write) {
            true => " ",
            false => "*"
        };
        //"NAME","TYPE","BLOCKS","MODIFIED","CREATED","ENDFILE","SUBTYPE"
        write!(f,"{}{:15} {:4} {:6} {:16} {:16} {:7} {:7}",
            write_protect,
            match self.is_dir() { true => self.name().blue().bold(), false => self.name().normal() },
            file_type_name(self.file_type),
            self.blocks_used,
            mod_time,
            create_time,
            self.eof(),
            self.aux_type
        )
    }
}

impl HasName for Entry {
    fn fname(&self) -> (u8,[u8;15]) {
        (self.stor_len_nibs,self.name)
    }
    fn name(&self) -> String {
        file_name_to_string(self.stor_len_nibs,&self.name)
    }
    fn storage_type(&self) -> Option<StorageType> {
        StorageType::from_nibs(self.stor_len_nibs)
    }
}

impl HasName for VolDirHeader {
    fn fname(&self) -> (u8,[u8;15]) {
        (self.stor_len_nibs,self.name)
    }
    /// Name with the GS/OS lowercase overlay applied, if the volume has one
    fn name(&self) -> String {
        let upper = file_name_to_string(self.stor_len_nibs,&self.name);
        if !self.has_lowercase() {
            return upper;
        }
        upper.chars().enumerate().map(|(i,c)| match c.is_ascii_uppercase() && self.is_lowercase(i) {
            true => c.to_ascii_lowercase(),
            false => c
        }).collect()
    }
    fn storage_type(&self) -> Option<StorageType> {
        StorageType::from_nibs(self.stor_len_nibs)
    }
}

impl HasName for SubDirHeader {
    fn fname(&self) -> (u8,[u8;15]) {
        (self.stor_len_nibs,self.name)
    }
    fn name(&self) -> String {
        file_name_to_string(self.stor_len_nibs,&self.name)
    }
    fn storage_type(&self) -> Option<StorageType> {
        StorageType::from_nibs(self.stor_len_nibs)
    }
}

#[cfg(test)]
fn vol_header_bytes(name: &str, lowercase: u16) -> Vec<u8> {
    let mut ans = vec![0;ENTRY_LEN];
    ans[0] = 0xf0 + name.len() as u8;
    ans[1..1+name.len()].copy_from_slice(name.as_bytes());
    ans[0x16..0x18].copy_from_slice(&lowercase.to_le_bytes());
    ans[0x1f] = 0x27;
    ans[0x20] = 0x0d;
    ans[0x21..0x23].copy_from_slice(&3u16.to_le_bytes());
    ans[0x23..0x25].copy_from_slice(&6u16.to_le_bytes());
    ans[0x25..0x27].copy_from_slice(&280u16.to_le_bytes());
    ans
}

#[test]
fn decode_vol_header() {
    let hdr = VolDirHeader::from_bytes(&vol_header_bytes("NEW.DISK",0)).expect("decode failed");
    assert_eq!(hdr.name(),"NEW.DISK");
    assert_eq!(hdr.name_len(),8);
    assert_eq!(hdr.total_blocks(),280);
    assert_eq!(hdr.bitmap_ptr(),6);
    assert_eq!(hdr.file_count(),3);
    assert_eq!(hdr.entry_len(),0x27);
    assert_eq!(hdr.storage_type(),Some(StorageType::VolDirHeader));
}

#[test]
fn lowercase_overlay() {
    // bits 0 and 4 lower the `N` and `D`, bit 3 points at `.` and has no effect
    let hdr = VolDirHeader::from_bytes(&vol_header_bytes("NEW.DISK",0x8019)).expect("decode failed");
    assert_eq!(hdr.name(),"nEW.dISK");
    // without bit 15 the flags are ignored
    let hdr = VolDirHeader::from_bytes(&vol_header_bytes("NEW.DISK",0x00ff)).expect("decode failed");
    assert_eq!(hdr.name(),"NEW.DISK");
}

#[test]
fn wrong_discriminant() {
    let mut dat = vol_header_bytes("NEW.DISK",0);
    dat[0] = 0xe8;
    match VolDirHeader::from_bytes(&dat) {
        Err(e) => assert_eq!(e.kind(),ErrorKind::InvalidArgument),
        Ok(_) => panic!("subdirectory header decoded as volume header")
    }
    assert!(SubDirHeader::from_bytes(&dat).is_ok());
    match Entry::from_bytes(&dat[0..38]) {
        Err(e) => assert_eq!(e.kind(),ErrorKind::InvalidArgument),
        Ok(_) => panic!("short entry was accepted")
    }
}

#[test]
fn decode_twice() {
    let dat = vol_header_bytes("SAME",0x8001);
    assert_eq!(VolDirHeader::from_bytes(&dat).expect("decode failed"),VolDirHeader::from_bytes(&dat).expect("decode failed"));
    let mut dat = vol_header_bytes("SAME",0);
    dat[0] = 0xe4;
    assert_eq!(SubDirHeader::from_bytes(&dat).expect("decode failed"),SubDirHeader::from_bytes(&dat).expect("decode failed"));
    dat[0] = 0x14;
    dat[0x11..0x13].copy_from_slice(&7u16.to_le_bytes());
    let first = Entry::from_bytes(&dat).expect("decode failed");
    assert_eq!(first,Entry::from_bytes(&dat).expect("decode failed"));
    assert_eq!(first.get_ptr(),7);
}

#[test]
fn dates() {
    // 14-Mar-85 10:30
    let date: u16 = (85 << 9) + (3 << 5) + 14;
    let time: u16 = (10 << 8) + 30;
    let raw = [date.to_le_bytes(),time.to_le_bytes()].concat();
    let dt = unpack_time([raw[0],raw[1],raw[2],raw[3]]).expect("no date");
    assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(),"1985-03-14 10:30");
    // year 5 lands in 2005
    let date: u16 = (5 << 9) + (12 << 5) + 31;
    let dt = unpack_time([date.to_le_bytes()[0],date.to_le_bytes()[1],0,0]).expect("no date");
    assert_eq!(dt.format("%Y-%m-%d").to_string(),"2005-12-31");
    assert_eq!(unpack_time([0;4]),None);
    // month 13 is not a date
    let date: u16 = (90 << 9) + (13 << 5) + 1;
    assert_eq!(unpack_time([date.to_le_bytes()[0],date.to_le_bytes()[1],0,0]),None);
}

#[test]
fn name_validity() {
    assert!(is_name_valid("hello.world"));
    assert!(!is_name_valid("1HELLO"));
    assert!(!is_name_valid("ABCDEFGHIJKLMNOP"));
}
