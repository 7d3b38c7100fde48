use clap::{value_parser,crate_version,Arg,ArgAction,Command,ValueHint};

const POS_HELP: &str = "lines and columns count from zero, as in the language server protocol";
const LIB_LONG_HELP: &str = "Directory to search for macro definitions and copy members.
A member is a file named after it, with or without an extension, matched without regard to case.
The option can be repeated, directories are searched in order.";

fn file_arg() -> Arg {
    Arg::new("file").short('f').long("file").value_name("PATH")
        .help("path to the open code source")
        .value_hint(ValueHint::FilePath)
        .required(true)
}

fn lib_arg() -> Arg {
    Arg::new("lib").short('L').long("lib").value_name("DIR")
        .help("macro and copy library directory")
        .long_help(LIB_LONG_HELP)
        .value_hint(ValueHint::DirPath)
        .action(ArgAction::Append)
        .required(false)
}

fn config_arg() -> Arg {
    Arg::new("config").long("config").value_name("PATH")
        .help("JSON settings file")
        .value_hint(ValueHint::FilePath)
        .required(false)
}

fn uri_arg() -> Arg {
    Arg::new("uri").long("uri").value_name("URI")
        .help("query a library file instead of the open code")
        .required(false)
}

fn line_arg() -> Arg {
    Arg::new("line").short('l').long("line").value_name("LINE")
        .help("line of the position")
        .value_parser(value_parser!(u32))
        .required(true)
}

fn col_arg() -> Arg {
    Arg::new("col").short('c').long("col").value_name("COLUMN")
        .help("column of the position")
        .value_parser(value_parser!(u32))
        .required(true)
}

fn query(name: &'static str,about: &'static str,positional: bool) -> Command {
    let ans = Command::new(name)
        .arg(file_arg())
        .arg(lib_arg())
        .arg(config_arg())
        .arg(uri_arg())
        .about(about);
    match positional {
        true => ans.arg(line_arg()).arg(col_arg()).after_help(POS_HELP),
        false => ans
    }
}

pub fn build_cli() -> Command {
    let long_help = "hlasmkit is always invoked with exactly one of several subcommands.
Each subcommand analyzes the open code, follows conditional assembly, expands macros
and copy members, then answers one query as JSON on stdout.
Set RUST_LOG environment variable to control logging level.
  levels: trace,debug,info,warn,error

Examples:
---------
outline:          `hlasmkit outline -f prog.hlasm -L maclib`
go to definition: `hlasmkit definition -f prog.hlasm -l 10 -c 9`
complete macros:  `hlasmkit complete -f prog.hlasm -l 12 -c 12 -L maclib`";

    let mut main_cmd = Command::new("hlasmkit")
        .about("Semantic queries on High Level Assembler sources.")
        .after_long_help(long_help)
        .version(crate_version!());

    main_cmd = main_cmd.subcommand(
        query("outline","write document symbols to stdout",false)
            .arg(Arg::new("native").long("native")
                .help("write the assembler's symbol kinds instead of LSP document symbols")
                .action(ArgAction::SetTrue))
    );
    main_cmd = main_cmd.subcommand(query("definition","write the definition of the symbol at a position",true));
    main_cmd = main_cmd.subcommand(query("references","write the references to the symbol at a position",true));
    main_cmd = main_cmd.subcommand(query("hover","write the hover at a position",true));
    main_cmd = main_cmd.subcommand(
        query("complete","write the completion items at a position",true)
            .arg(Arg::new("trigger").short('t').long("trigger").value_name("CHAR")
                .help("character that triggered the completion, `&` or `.`")
                .required(false))
    );
    main_cmd
}
