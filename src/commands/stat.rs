use clap;
use crate::STDRESULT;

pub fn stat(cmd: &clap::ArgMatches) -> STDRESULT {
    let mut file = super::open_image(cmd)?;
    let mut vol = super::open_volume(cmd,&mut file)?;
    println!("{}",vol.stat(cmd.get_one::<u16>("indent").copied())?);
    Ok(())
}

pub fn catalog(cmd: &clap::ArgMatches) -> STDRESULT {
    let default_path = "/".to_string();
    let path_in_img = cmd.get_one::<String>("file").unwrap_or(&default_path);
    let mut file = super::open_image(cmd)?;
    let mut vol = super::open_volume(cmd,&mut file)?;
    vol.catalog_to_stdout(path_in_img)?;
    Ok(())
}

pub fn tree(cmd: &clap::ArgMatches) -> STDRESULT {
    let mut file = super::open_image(cmd)?;
    let mut vol = super::open_volume(cmd,&mut file)?;
    println!("{}",vol.tree(cmd.get_flag("meta"),cmd.get_one::<u16>("indent").copied())?);
    Ok(())
}
