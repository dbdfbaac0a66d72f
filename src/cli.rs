use clap::{value_parser, crate_version, Arg, ArgAction, Command, ValueHint};

const T_LONG_HELP: &str = "`data` is the file's data, which for a GS/OS forked file is the data fork.
`rsrc` is the resource fork of a forked file.
`block` is a raw block, in which case PATH is the block number.";

fn file_arg(help: &'static str, req: bool) -> Arg {
    Arg::new("file").short('f').long("file").value_name("PATH").required(req).help(help)
}

fn indent_arg() -> Arg {
    Arg::new("indent").long("indent").help("JSON indentation, omit to minify")
        .value_name("SPACES")
        .value_parser(value_parser!(u16).range(0..16))
        .required(false)
}

fn dimg_arg() -> Arg {
    Arg::new("dimg").short('d').long("dimg").help("path to disk image itself")
        .value_name("PATH")
        .value_hint(ValueHint::FilePath)
        .required(true)
}

fn offset_arg() -> Arg {
    Arg::new("offset").long("offset").help("byte offset of the volume within the image")
        .value_name("BYTES")
        .value_parser(value_parser!(u64))
        .required(false)
}

pub fn build_cli() -> Command {
    let long_help = "a2prodos is always invoked with exactly one of several subcommands.
Volumes are only ever read, never written.
Set RUST_LOG environment variable to control logging level.
  levels: trace,debug,info,warn,error

Examples:
---------
list the volume directory:   `a2prodos catalog -d myimg.po`
list a subdirectory:         `a2prodos catalog -d myimg.po -f /myvol/system`
show the tree with metadata: `a2prodos tree -d myimg.po --meta --indent 2`
copy out a file:             `a2prodos get -d myimg.po -f system/prodos > prodos.sys`
copy out a resource fork:    `a2prodos get -d myimg.po -f finder.data -t rsrc > finder.rsrc`";

    let mut main_cmd = Command::new("a2prodos")
        .about("Reads files and directories from ProDOS and GS/OS disk images.")
        .after_long_help(long_help)
        .version(crate_version!());

    main_cmd = main_cmd.subcommand(
        Command::new("catalog")
            .arg(file_arg("path of directory inside disk image", false))
            .arg(dimg_arg())
            .arg(offset_arg())
            .visible_alias("ls")
            .visible_alias("cat")
            .about("write disk image catalog to stdout"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("tree")
            .arg(dimg_arg())
            .arg(offset_arg())
            .arg(Arg::new("meta").long("meta").help("include metadata").action(ArgAction::SetTrue))
            .arg(indent_arg())
            .about("write directory tree as a JSON string to stdout"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("stat")
            .arg(dimg_arg())
            .arg(offset_arg())
            .arg(indent_arg())
            .about("write volume header and allocation counts as a JSON string to stdout"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("get")
            .arg(file_arg("path, or block number, inside disk image", true))
            .arg(
                Arg::new("type").short('t').long("type").value_name("TYPE").help("type of the item")
                    .value_parser(["data", "rsrc", "block"])
                    .long_help(T_LONG_HELP)
                    .default_value("data")
                    .required(false),
            )
            .arg(dimg_arg())
            .arg(offset_arg())
            .about("read from disk image, write to stdout"),
    );
    main_cmd
}
