use clap::{Arg, ArgAction, Command, value_parser};

fn fixtures_arg() -> Arg {
    Arg::new("fixtures")
        .long("fixtures")
        .help("Fixtures file describing the session and users (default: ~/.tracker/fixtures.json)")
        .value_name("FILE")
}

pub fn refresh_command() -> Command {
    Command::new("refresh")
        .about("Queue uids for a cached-then-live relationship refresh")
        .long_about(
            "Starts the background refresh loader against the fixtures, queues every \
             uid and prints each published result as a JSON line. Exits once every \
             expected result is published, on timeout, or on Ctrl-C.",
        )
        .arg(
            Arg::new("uids")
                .help("Uids to refresh, in queue order")
                .required(true)
                .num_args(1..)
                .index(1),
        )
        .arg(fixtures_arg())
        .arg(
            Arg::new("session")
                .long("session")
                .help("Override the fixtures' logged-in uid")
                .value_name("UID"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("Seconds to wait for results before shutting down")
                .value_name("SECS")
                .value_parser(value_parser!(u64).range(1..))
                .default_value("30"),
        )
}

pub fn resolve_command() -> Command {
    Command::new("resolve")
        .about("Resolve a load target to a uid")
        .long_about(
            "An explicit --uid wins; otherwise --assertion is looked up by username; \
             otherwise the session's uid is used.",
        )
        .arg(
            Arg::new("uid")
                .long("uid")
                .help("Explicit uid")
                .value_name("UID"),
        )
        .arg(
            Arg::new("assertion")
                .long("assertion")
                .help("Username to resolve through the identity service")
                .value_name("ASSERTION"),
        )
        .arg(
            Arg::new("offline")
                .long("offline")
                .help("Forbid network lookups")
                .action(ArgAction::SetTrue),
        )
        .arg(fixtures_arg())
        .arg(
            Arg::new("session")
                .long("session")
                .help("Override the fixtures' logged-in uid")
                .value_name("UID"),
        )
}
