use clap::Parser;
use flexi_logger::{DeferredNow, FileSpec, Logger, LoggerHandle, Record, WriteMode};
use green_harness::commands::cli::{Cli, Commands};
use green_harness::commands::{describe, measure, plan};
use green_harness::config::Config;
use std::io::{Error, Write};
use std::path::Path;

fn custom_format(w: &mut dyn Write, now: &mut DeferredNow, record: &Record) -> Result<(), Error> {
    write!(
        w,
        "[{}] {:5} {}",
        now.format("%d-%m-%Y %H:%M:%S"),
        record.level(),
        record.args()
    )
}

fn configure_logger(
    level: &str,
    output_dir: Option<&Path>,
) -> Result<LoggerHandle, Box<dyn std::error::Error>> {
    let logger = Logger::try_with_str(level)?.format(custom_format);
    let logger = match output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let spec = FileSpec::default()
                .directory(dir)
                .basename("harness")
                .suppress_timestamp();
            logger.log_to_file(spec).write_mode(WriteMode::Direct).append()
        }
        None => logger,
    };
    Ok(logger.start()?)
}

fn start_logger(config: &Config, output_dir: Option<&Path>) -> LoggerHandle {
    match configure_logger(&config.log_level, output_dir) {
        Ok(handle) => handle,
        Err(err) => {
            eprintln!("Failed to configure logger: {}", err);
            std::process::exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let config = Config::global();

    let result = match cli.command {
        Commands::Measure(args) => {
            let _logger = start_logger(config, Some(args.folder(config).as_path()));
            measure::run(args, config)
        }
        Commands::Plan(args) => {
            let loaded = args.load(config);
            let dir = loaded.as_ref().ok().map(|(_, folder)| folder.as_path());
            let _logger = start_logger(config, dir);
            match loaded.and_then(|(benchmarks, folder)| plan::run(&benchmarks, &folder, config)) {
                Ok(0) => Ok(()),
                Ok(failed) => {
                    eprintln!("{} benchmark(s) failed", failed);
                    std::process::exit(1);
                }
                Err(err) => Err(err),
            }
        }
        Commands::Describe(args) => {
            let _logger = start_logger(config, None);
            describe::run(args, config, &mut std::io::stdout().lock())
        }
    };

    if let Err(err) = result {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
