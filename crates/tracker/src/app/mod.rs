mod global;
mod relationships;


use clap::Command;

pub fn build_cli() -> Command {
    global::root_command()
        .subcommand(relationships::refresh_command())
        .subcommand(relationships::resolve_command())
}
