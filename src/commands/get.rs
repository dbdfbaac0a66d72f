use clap;
use std::io::Write;
use std::str::FromStr;
use log::{debug,error};
use super::{ItemType,CommandError};
use crate::fs::prodos::directory::HasName;
use crate::STDRESULT;

/// Raw bytes go to a pipe or file as is, to a console as a hex dump
fn output_get(object: &[u8]) -> STDRESULT {
    if atty::is(atty::Stream::Stdout) {
        crate::display_block(0,object);
    } else {
        let mut stdout = std::io::stdout();
        stdout.write_all(object)?;
        stdout.flush()?;
    }
    Ok(())
}

pub fn get(cmd: &clap::ArgMatches) -> STDRESULT {
    let src_path = match cmd.get_one::<String>("file") {
        Some(path) => path,
        None => return Err(Box::new(CommandError::InvalidCommand))
    };
    let typ = match cmd.get_one::<String>("type") {
        Some(s) => ItemType::from_str(s)?,
        None => ItemType::Data
    };
    let mut file = super::open_image(cmd)?;
    let mut vol = super::open_volume(cmd,&mut file)?;
    let object = match typ {
        ItemType::Block => {
            let iblock = match u16::from_str(src_path) {
                Ok(n) => n,
                Err(_) => {
                    error!("block must be a number from 0 to 65535");
                    return Err(Box::new(CommandError::OutOfRange));
                }
            };
            vol.read_raw_block(iblock)?.to_vec()
        },
        ItemType::Data => {
            let entry = vol.find_entry(src_path)?;
            debug!("get data for {}, eof {}",entry.name(),entry.eof());
            vol.get_file_data(&entry)?
        },
        ItemType::Resource => {
            let entry = vol.find_entry(src_path)?;
            if entry.is_dir() {
                error!("{} is a directory",entry.name());
                return Err(Box::new(CommandError::NotAFile));
            }
            vol.get_resource_fork(&entry)?
        }
    };
    output_get(&object)
}
