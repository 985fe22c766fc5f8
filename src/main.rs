// Enable warnings for all clippy lints.
#![warn(
    clippy::correctness,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::pedantic,
    clippy::cargo,
    clippy::restriction
)]
// Selectively disable warnings for some lints.
#![allow(
    clippy::module_name_repetitions,  // Allow name repetitions in module and type names.
    clippy::use_debug, // Debug formatting is useful.
    clippy::float_arithmetic, // Needed.
    clippy::multiple_crate_versions, // Beyond our control.
    clippy::missing_docs_in_private_items, // Disabled.
    clippy::missing_inline_in_public_items, // Not considered for now.
    clippy::implicit_return, // Allow.
    clippy::use_self, // Too pedantic.
    clippy::shadow_same,
    clippy::unknown_clippy_lints
)]
// Mark some lints as errors.
#![deny(clippy::print_stdout)]

use clap::{arg_enum, value_t, App, Arg, ArgMatches};
use log::{info, Level};
use rankflow::config::{parse_smart_updating, RankConfig};
use rankflow::error::{config_error, RankFlowError};
use rankflow::util::logger::init_logger_with_level;
use rankflow::util::timer::RfTimer;
use rankflow::RankJob;
use std::str::FromStr;

arg_enum! {
    #[derive(PartialEq, Debug)]
    pub enum LogLevel {
        Error,
        Warn,
        Info,
        Debug,
        Trace,
    }
}

fn main() -> Result<(), RankFlowError> {
    // Parse command line arguments.
    let matches = build_app().get_matches();

    setup_logger(&matches)?;

    let config = parse_config(&matches)?;
    let job = RankJob::new(
        matches.value_of("input").unwrap_or_default().to_owned(),
        matches.value_of("topics").map(str::to_owned),
        matches.value_of("output").map(str::to_owned),
        matches.is_present("resume"),
    );

    let timer = RfTimer::now();
    let ranked = rankflow::run_pagerank(config, &job)?;
    info!("Reported {} ranks in {}", ranked.len(), timer.elapsed().to_seconds_string());
    Ok(())
}

fn build_app<'a, 'b>() -> App<'a, 'b> {
    App::new("rankflow")
        .about("Computes PageRank with a simulated map/shuffle/reduce dataflow")
        .arg(
            Arg::from_usage("[input] 'Graph records, one `id<TAB>adjacency` per line'")
                .required_unless("resume"),
        )
        .arg(Arg::from_usage(
            "-n, --estimated-nodes=[COUNT] 'Estimated node count, used for the initial ranks'",
        ))
        .arg(Arg::from_usage("-p, --partitions=[COUNT] 'Number of partitions'").default_value("1"))
        .arg(Arg::from_usage(
            "-t, --threads=[COUNT] 'Workers per stage. Defaults to the number of partitions'",
        ))
        .arg(Arg::from_usage("-i, --iterations=[COUNT] 'Number of iterations'").default_value("5"))
        .arg(
            Arg::from_usage("-d, --damping-factor=[FACTOR] 'Probability of following a link'")
                .default_value("0.85"),
        )
        .arg(
            Arg::from_usage(
                "-s, --smart-updating=[BOOL] 'Blend ranks that change by less than 30%'",
            )
            .default_value("false"),
        )
        .arg(
            Arg::from_usage("-k, --top-k=[COUNT] 'Number of ranks to report'").default_value("100"),
        )
        .arg(Arg::from_usage("--topics=[FILE] 'An `id,topic` csv, for topic-sensitive ranks'"))
        .arg(Arg::from_usage("-o, --output=[FILE] 'Write the ranks to a file instead of the log'"))
        .arg(Arg::from_usage("--checkpoint-dir=[DIR] 'Save a checkpoint after every iteration'"))
        .arg(
            Arg::from_usage("--resume 'Continue from the checkpoint in --checkpoint-dir'")
                .requires("checkpoint-dir"),
        )
        .arg(Arg::from_usage("--min-rank=[RANK] 'Only report ranks above this value'"))
        .arg(Arg::from_usage("-a, --all 'Report every rank instead of the top k'"))
        .arg(
            Arg::from_usage("-l, --loglevel=[LEVEL] 'Set the log level'")
                .possible_values(&LogLevel::variants())
                .case_insensitive(true),
        )
}

fn parse_config(matches: &ArgMatches) -> Result<RankConfig, RankFlowError> {
    let estimated_node_count = matches
        .value_of("estimated-nodes")
        .ok_or_else(|| config_error("An estimated node count is needed".to_owned()))
        .and_then(|value| parse_value::<f64>("estimated-nodes", value))?;
    let num_partitions = parse_arg::<usize>(matches, "partitions")?;
    let threads = match matches.value_of("threads") {
        Some(value) => parse_value::<usize>("threads", value)?,
        None => num_partitions,
    };
    let min_rank = match matches.value_of("min-rank") {
        Some(value) => Some(parse_value::<f64>("min-rank", value)?),
        None => None,
    };
    let config = RankConfig::new(
        estimated_node_count,
        num_partitions,
        threads,
        parse_arg::<usize>(matches, "iterations")?,
        parse_arg::<f64>(matches, "damping-factor")?,
        parse_smart_updating(matches.value_of("smart-updating").unwrap_or("false"))?,
        parse_arg::<usize>(matches, "top-k")?,
        matches.is_present("all"),
        min_rank,
        matches.value_of("checkpoint-dir").map(str::to_owned),
    );
    config.validate()?;
    Ok(config)
}

fn parse_arg<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<T, RankFlowError> {
    let value = matches
        .value_of(name)
        .ok_or_else(|| config_error(format!("Missing value for '--{}'", name)))?;
    parse_value(name, value)
}

fn parse_value<T: FromStr>(name: &str, value: &str) -> Result<T, RankFlowError> {
    value.parse::<T>().map_err(|_| {
        config_error(format!("Could not parse '{}' as the value of '--{}'", value, name))
    })
}

fn setup_logger(matches: &ArgMatches) -> Result<(), RankFlowError> {
    // Set log level.
    let log_level = match value_t!(matches, "loglevel", LogLevel).unwrap_or(LogLevel::Info) {
        LogLevel::Error => Level::Error,
        LogLevel::Warn => Level::Warn,
        LogLevel::Info => Level::Info,
        LogLevel::Debug => Level::Debug,
        LogLevel::Trace => Level::Trace,
    };
    init_logger_with_level(log_level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_is_optional_when_resuming() {
        let matches = build_app()
            .get_matches_from_safe(vec![
                "rankflow",
                "--resume",
                "--checkpoint-dir",
                "ckpt",
                "-n",
                "4",
            ])
            .expect("resume without input");
        assert_eq!(matches.value_of("input"), None);
        assert!(matches.is_present("resume"));

        assert!(build_app().get_matches_from_safe(vec!["rankflow", "-n", "4"]).is_err());
        let matches = build_app()
            .get_matches_from_safe(vec!["rankflow", "graph.txt", "-n", "4"])
            .expect("input given");
        assert_eq!(matches.value_of("input"), Some("graph.txt"));
    }
}
