use std::{path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::{error::ErrorKind, ArgGroup, Parser};
use dotenv::dotenv;
use url::Url;

use rds_logs::{
    config::{Config, Credentials, DEFAULT_REGION},
    download::LogDownloader,
    enumerate::LogEnumerator,
    error::LogsError,
    follow::{FollowOptions, LogFollower},
    provider::RdsProvider,
};

#[derive(Parser, Debug)]
#[command(version, about = "List, follow and download RDS database log files", long_about = None)]
#[command(group(ArgGroup::new("action").required(true).args(["follow", "save", "print"])))]
struct Cli {
    #[arg(short, long, action = clap::ArgAction::Count, help = "Increase log level (use -v for info, -vv for debug, -vvv for trace)")]
    verbose: u8,

    /// Identifier of the database instance
    #[arg(short, long, default_value = "")]
    database: String,

    /// Amazon region
    #[arg(short, long, env = "AWS_REGION", default_value = DEFAULT_REGION)]
    region: String,

    /// Location for saving the log
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Follow the log named in -l
    #[arg(short, long)]
    follow: bool,

    /// Log to follow or save, or a name filter for -p
    #[arg(short, long)]
    log: Option<String>,

    /// Download the log named in -l
    #[arg(short, long)]
    save: bool,

    /// Print log file names to stdout
    #[arg(short, long)]
    print: bool,

    /// directly set an endpoint such as http://localhost:4566
    /// for local development or another RDS compatible API
    #[arg(long)]
    endpoint: Option<Url>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Follow,
    Save,
    Print,
}

impl Cli {
    fn action(&self) -> Action {
        match (self.follow, self.save) {
            (true, _) => Action::Follow,
            (_, true) => Action::Save,
            _ => Action::Print,
        }
    }

    fn config(&self, credentials: Option<Credentials>) -> Config {
        let mut config = Config::new(&self.database, &self.region).with_output_dir(&self.output);
        if let Some(endpoint) = &self.endpoint {
            config = config.with_endpoint(endpoint.clone());
        }
        if let Some(credentials) = credentials {
            config = config.with_credentials(credentials);
        }
        config
    }

    /// The log name `-f` and `-s` operate on.
    fn log_name(&self) -> Result<&str, LogsError> {
        match self.log.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(LogsError::Config(
                "a log name is required with -f/--follow and -s/--save (-l/--log)".to_string(),
            )),
        }
    }

    fn validate(&self, config: &Config) -> Result<(), LogsError> {
        config.require_instance()?;
        if self.action() != Action::Print {
            self.log_name()?;
        }
        Ok(())
    }
}

fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn,rds_logs=info",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn init_logging(verbose: u8) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(verbose)))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    init_logging(cli.verbose);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<(), anyhow::Error> {
    let config = cli.config(Credentials::from_env());
    cli.validate(&config)?;

    match cli.action() {
        Action::Print => {
            let filter = cli.log.as_deref().unwrap_or_default();
            let provider = RdsProvider::from_config(&config).await;
            let logs = LogEnumerator::new(provider, &config.instance)
                .list(filter)
                .await
                .with_context(|| format!("listing log files of {}", config.instance))?;

            for descriptor in logs {
                println!("{}", descriptor.name);
            }
        }
        Action::Follow => {
            let log_name = cli.log_name()?;
            let provider = RdsProvider::from_config(&config).await;
            let mut follower =
                LogFollower::new(provider, &config.instance, log_name, FollowOptions::default());

            let never = follower
                .run(std::io::stdout())
                .await
                .with_context(|| format!("following {}", log_name))?;
            match never {}
        }
        Action::Save => {
            let log_name = cli.log_name()?;
            let path = LogDownloader::new(config)?
                .download(log_name)
                .await
                .with_context(|| format!("downloading {}", log_name))?;

            println!("{}", path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("rds-logs").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["-d", "mydb", "-p"]).unwrap();

        assert_eq!(cli.action(), Action::Print);
        assert_eq!(cli.output, PathBuf::from("."));
        assert!(cli.log.is_none());
        assert!(cli.endpoint.is_none());
    }

    #[test]
    fn test_short_flags() {
        let cli = parse(&["-d", "mydb", "-r", "us-east-2", "-o", "/tmp", "-l", "error/log1", "-s"])
            .unwrap();
        let config = cli.config(Some(Credentials::new("AKID", "secret")));

        assert_eq!(cli.action(), Action::Save);
        assert_eq!(config.instance, "mydb");
        assert_eq!(config.region, "us-east-2");
        assert_eq!(config.output_dir, PathBuf::from("/tmp"));
        assert_eq!(cli.log_name().unwrap(), "error/log1");
        assert!(cli.validate(&config).is_ok());
    }

    #[test]
    fn test_actions_are_exclusive() {
        let err = parse(&["-d", "mydb", "-f", "-s", "-l", "error/log1"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);

        let err = parse(&["-d", "mydb"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_follow_requires_log_name() {
        let cli = parse(&["-d", "mydb", "-f"]).unwrap();
        let config = cli.config(None);

        assert_eq!(cli.action(), Action::Follow);
        assert!(matches!(cli.validate(&config), Err(LogsError::Config(_))));
    }

    #[test]
    fn test_every_action_requires_database() {
        let cli = parse(&["-p", "-l", "error"]).unwrap();
        let config = cli.config(None);

        assert!(matches!(cli.validate(&config), Err(LogsError::Config(_))));
    }

    #[test]
    fn test_verbosity_levels() {
        let cases: [&[&str]; 5] = [&[], &["-v"], &["-vv"], &["-vvv"], &["-v", "-v", "-v", "-v"]];
        let levels: Vec<&str> = cases
            .iter()
            .map(|flags| {
                let args: Vec<&str> = ["-d", "mydb", "-p"].iter().chain(flags.iter()).copied().collect();
                log_filter(parse(&args).unwrap().verbose)
            })
            .collect();

        assert_eq!(levels, vec!["warn,rds_logs=info", "info", "debug", "trace", "trace"]);
    }

    #[test]
    fn test_database_is_trimmed() {
        let cli = parse(&["-d", " mydb ", "-p"]).unwrap();
        let config = cli.config(None);

        assert_eq!(config.instance, "mydb");
        assert!(cli.validate(&config).is_ok());
    }

    #[test]
    fn test_endpoint_must_be_url() {
        assert!(parse(&["-d", "mydb", "-p", "--endpoint", "not a url"]).is_err());

        let cli = parse(&["-d", "mydb", "-p", "--endpoint", "http://localhost:4566"]).unwrap();
        assert_eq!(cli.endpoint.unwrap().as_str(), "http://localhost:4566/");
    }
}
