//! ### Directory traversal
//!
//! `DirCursor` walks a chain of directory blocks and yields live entries until the
//! count declared in the directory header is reached.  It holds no borrow, so the
//! caller can read file data between steps.  `Entries` wraps a cursor and a volume
//! borrow into an ordinary iterator.

use std::collections::HashSet;
use std::io::{Read,Seek};
use log::{trace,error};
use super::Volume;
use super::directory::Entry;
use super::types::*;

pub struct DirCursor {
    key_block: u16,
    curr_block: u16,
    declared: u16,
    yielded: u16,
    buf: Option<[u8;BLOCK_SIZE]>,
    offset: usize,
    visited: HashSet<u16>,
    done: bool
}

impl DirCursor {
    /// Start at `key_block`, whose first slot is taken by the header, and stop after `declared` entries
    pub fn new(key_block: u16,declared: u16) -> Self {
        Self {
            key_block,
            curr_block: key_block,
            declared,
            yielded: 0,
            buf: None,
            offset: 0,
            visited: HashSet::new(),
            done: false
        }
    }
    /// Number of entries the directory header promises
    pub fn declared(&self) -> u16 {
        self.declared
    }
    /// Number of entries yielded so far
    pub fn yielded(&self) -> u16 {
        self.yielded
    }
    fn fail(&mut self,e: Error) -> Option<Result<Entry,Error>> {
        self.done = true;
        Some(Err(e))
    }
    /// Get the next live entry.  After an error the cursor is exhausted.
    pub fn next<R: Read + Seek>(&mut self,vol: &mut Volume<R>) -> Option<Result<Entry,Error>> {
        loop {
            if self.done || self.yielded >= self.declared {
                return None;
            }
            let buf = match self.buf {
                Some(buf) => buf,
                None => {
                    if !self.visited.insert(self.curr_block) {
                        error!("directory at block {} links back to block {}",self.key_block,self.curr_block);
                        return self.fail(Error::Format(format!("directory at block {} does not terminate",self.key_block)));
                    }
                    let buf = match vol.device().read_block(self.curr_block) {
                        Ok(buf) => buf,
                        Err(e) => return self.fail(e)
                    };
                    // the header occupies the first slot of the key block
                    self.offset = match self.curr_block==self.key_block {
                        true => 4 + ENTRY_LEN,
                        false => 4
                    };
                    self.buf = Some(buf);
                    buf
                }
            };
            while self.offset + ENTRY_LEN <= BLOCK_SIZE {
                let slot = self.offset;
                self.offset += ENTRY_LEN;
                if buf[slot] >> 4 == 0 {
                    trace!("skip inactive slot at block {} offset {}",self.curr_block,slot);
                    continue;
                }
                return match Entry::from_bytes(&buf[slot..slot+ENTRY_LEN]) {
                    Ok(entry) => {
                        self.yielded += 1;
                        Some(Ok(entry))
                    },
                    Err(e) => self.fail(e)
                };
            }
            let next = u16::from_le_bytes([buf[2],buf[3]]);
            self.buf = None;
            if next==0 {
                error!("directory at block {} ended after {} of {} entries",self.key_block,self.yielded,self.declared);
                return self.fail(Error::Format(format!("directory at block {} is truncated, found {} of {} entries",
                    self.key_block,self.yielded,self.declared)));
            }
            self.curr_block = next;
        }
    }
}

/// Iterator over the live entries of one directory
pub struct Entries<'a,R: Read + Seek> {
    vol: &'a mut Volume<R>,
    cursor: DirCursor
}

impl<'a,R: Read + Seek> Entries<'a,R> {
    pub fn new(vol: &'a mut Volume<R>,cursor: DirCursor) -> Self {
        Self {
            vol,
            cursor
        }
    }
}

impl<'a,R: Read + Seek> Iterator for Entries<'a,R> {
    type Item = Result<Entry,Error>;
    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next(&mut *self.vol)
    }
}
