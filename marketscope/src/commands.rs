use clap::{arg, command};
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("marketscope")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("marketscope")
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Initializes the marketscope database on your filesystem")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Directory to store the marketscope database")
                        .default_value("~/.config/marketscope/"),
                )
                .arg(
                    arg!(-f --"force")
                        .help("Forces the overwriting of any existing database at the specified location.")
                        .required(false),
                ),
        )
        .subcommand(
            command!("scrape")
                .about("Fetches a batch of marketplace listings and ingests them with fresh estimates")
                .arg(
                    arg!(-l --"limit" <N>)
                        .required(false)
                        .help("Number of listings to fetch (capped at 300)")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("50"),
                )
                .arg(
                    arg!(-d --"db" <PATH>)
                        .required(false)
                        .help("Path to the marketscope database"),
                ),
        )
        .subcommand(
            command!("estimate")
                .about("Fetches a single product page and computes its traffic and MRR estimates")
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The product page URL to fetch")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(-d --"db" <PATH>)
                        .required(false)
                        .help("Path to the marketscope database"),
                ),
        )
        .subcommand(
            command!("report")
                .about("Renders a summary of ingested products and their estimates")
                .arg(
                    arg!(-d --"db" <PATH>)
                        .required(false)
                        .help("Path to the marketscope database"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text or json")
                        .default_value("text"),
                ),
        )
}
