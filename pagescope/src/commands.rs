use crate::CLAP_STYLING;
use clap::{arg, command, value_parser};

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("pagescope")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("pagescope")
        .styles(CLAP_STYLING)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            command!("serve")
                .about("Run the page analysis HTTP service")
                .arg(
                    arg!(-p --"port" <PORT>)
                        .required(false)
                        .help("Port for the public API")
                        .env("PAGESCOPE_PORT")
                        .value_parser(value_parser!(u16))
                        .default_value("8080"),
                )
                .arg(
                    arg!(--"debug-port" <PORT>)
                        .required(false)
                        .help("Loopback port serving health and metrics")
                        .env("PAGESCOPE_DEBUG_PORT")
                        .value_parser(value_parser!(u16))
                        .default_value("6060"),
                )
                .arg(
                    arg!(-l --"log-level" <LEVEL>)
                        .required(false)
                        .help("Log level: trace, debug, info, warn, error")
                        .env("PAGESCOPE_LOG_LEVEL")
                        .default_value("info"),
                )
                .arg(
                    arg!(--"log-format" <FORMAT>)
                        .required(false)
                        .help("Log output format")
                        .env("PAGESCOPE_LOG_FORMAT")
                        .value_parser(["json", "text"])
                        .default_value("json"),
                )
                .arg(
                    arg!(-c --"concurrency" <NUM_THREADS>)
                        .required(false)
                        .help(
                            "Runtime worker threads; each analysis uses twice as many link \
                        workers (default: number of CPUs)",
                        )
                        .env("PAGESCOPE_CONCURRENCY")
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    arg!(--"request-timeout" <SECONDS>)
                        .required(false)
                        .help("Upper bound for a single analyze request")
                        .env("PAGESCOPE_REQUEST_TIMEOUT")
                        .value_parser(value_parser!(u64))
                        .default_value("60"),
                ),
        )
        .subcommand(
            command!("analyze")
                .about("Analyze a single page and print the report")
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The page to analyze"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("Number of concurrent link checkers")
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    arg!(-l --"log-level" <LEVEL>)
                        .required(false)
                        .help("Log level for diagnostics on stderr")
                        .env("PAGESCOPE_LOG_LEVEL")
                        .default_value("warn"),
                ),
        )
}
