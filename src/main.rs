use std::sync::Arc;

use log::{error, info, warn};
use log4rs::{
    append::rolling_file::{
        policy::compound::{
            roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger, CompoundPolicy,
        },
        RollingFileAppender,
    },
    config::{Appender, Config as LogConfig, Root},
    encode::pattern::PatternEncoder,
};
use tokio::{
    io::{stdin, stdout, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    sync::Mutex,
};

mod balance_engine;
mod commands;
mod config;
mod database;
mod endpoints;
mod error;
mod formatter;
mod parser;
mod reporting;
mod types;
mod validator;

use crate::commands::{descriptions, handle_line, Reply};
use crate::config::Config;
use crate::database::{memory::InMemoryDatabase, sqlite::SqliteDatabase, Database};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_log(&config);

    if config.is_in_memory() {
        info!("Using an in-memory database, nothing will be saved");
        run_console(InMemoryDatabase::new()).await
    } else {
        info!("Opening database {}...", config.database_path);
        let database = SqliteDatabase::new(&config.database_path)
            .map_err(|e| error!("Cannot initialize database: {}", e))
            .expect("Cannot initialize database");
        run_console(database).await
    }
}

/// Read commands from stdin, one per line, until `/quit` or end of input.
async fn run_console<D: Database>(database: D) -> anyhow::Result<()> {
    let database = Arc::new(Mutex::new(database));
    let mut stdout = stdout();

    stdout.write_all(descriptions().as_bytes()).await?;
    run_session(&database, BufReader::new(stdin()), &mut stdout).await?;

    info!("Bye!");
    Ok(())
}

/// Answer each line of *input* on *output*.
///
/// A line that is not valid UTF-8 gets an error reply, like any other failed command.
async fn run_session<D, R, W>(
    database: &Arc<Mutex<D>>,
    mut input: R,
    output: &mut W,
) -> anyhow::Result<()>
where
    D: Database,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();

    loop {
        output.write_all(b"> ").await?;
        output.flush().await?;

        buf.clear();
        if input.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }

        let reply = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => handle_line(database, line.trim()).await,
            Err(e) => {
                warn!("Discarding a line that is not valid UTF-8: {}", e);
                Reply::Text("An error occurred: the line is not valid UTF-8".to_string())
            }
        };

        match reply {
            Reply::Text(text) => {
                output.write_all(text.as_bytes()).await?;
                if !text.ends_with('\n') {
                    output.write_all(b"\n").await?;
                }
            }
            Reply::Quit => return Ok(()),
        }
    }
}

fn init_log(config: &Config) {
    let log_dir = match &config.log_dir {
        Some(log_dir) => log_dir,
        None => {
            // Interactive use: log to stderr, RUST_LOG takes precedence over the config.
            let mut builder = pretty_env_logger::formatted_builder();
            builder.filter_level(config.log_level);
            if let Ok(filters) = std::env::var("RUST_LOG") {
                builder.parse_filters(&filters);
            }
            builder.init();
            return;
        }
    };

    // Create a trigger that rolls the log file when it exceeds 10 MB.
    let size_trigger = SizeTrigger::new(10 * 1024 * 1024);

    // Create a roller that keeps up to 2 backup log files with a pattern.
    let roller_pattern = log_dir.join("splitledger.{}.log");
    let fixed_window_roller = FixedWindowRoller::builder()
        .build(&roller_pattern.to_string_lossy(), 2)
        .expect("[init log] Cannot create fixed window roller");

    // Combine trigger and roller into a compound policy.
    let compound_policy =
        CompoundPolicy::new(Box::new(size_trigger), Box::new(fixed_window_roller));

    // Create a rolling file appender.
    let rolling_file_appender = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d} - {l} - {m}{n}")))
        .build(log_dir.join("splitledger.log"), Box::new(compound_policy))
        .expect("[init log] Cannot create rolling file appender");

    // Create the configuration.
    let log_config = LogConfig::builder()
        .appender(Appender::builder().build("rolling_file", Box::new(rolling_file_appender)))
        .build(
            Root::builder()
                .appender("rolling_file")
                .build(config.log_level),
        )
        .expect("[init log] Cannot build config");

    // Initialize log4rs with the configuration
    log4rs::init_config(log_config).expect("[init log] Cannot init log4rs");
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(input: &[u8]) -> anyhow::Result<String> {
        let database = Arc::new(Mutex::new(InMemoryDatabase::new()));
        let mut output = Vec::new();
        run_session(&database, input, &mut output).await?;
        Ok(String::from_utf8(output)?)
    }

    #[tokio::test]
    async fn test_session_survives_invalid_utf8() -> anyhow::Result<()> {
        let output = run(b"/adduser a\n\xff\xfe\n/users\n/quit\n/adduser b\n").await?;

        assert_eq!(
            output,
            "> User 'a' added.\n\
             > An error occurred: the line is not valid UTF-8\n\
             > - a\n\
             > "
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_session_ends_with_input() -> anyhow::Result<()> {
        let output = run(b"\n  \n/users").await?;
        assert!(output.starts_with("> > > "));
        assert_eq!(output.matches("> ").count(), 4);
        Ok(())
    }
}
