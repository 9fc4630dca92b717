use tracker_core::init_logging;

mod app;
mod commands;
mod fixtures;

fn main() {
    let app = app::build_cli();
    let matches = app.get_matches();

    let verbose = matches.get_flag("verbose");
    init_logging(!verbose);

    if let Err(e) = commands::run_command(&matches) {
        // Handlers already printed the user-facing message.
        drop(e);
        std::process::exit(1);
    }
}
