use clap::{Arg, ArgAction, Command};

pub fn root_command() -> Command {
    Command::new("tracker")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Refresh follow relationships in the background")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
}
