use crate::cli::{execute, Cli};
use clap::Parser;
use owo_colors::{OwoColorize, Stream::Stderr};
use std::path::MAIN_SEPARATOR;
use std::process::ExitCode;

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    let f_appender =
        tracing_appender::rolling::hourly(format!(".{}", MAIN_SEPARATOR), "xmedia.log");
    let (non_blk, _guard) = tracing_appender::non_blocking(f_appender);
    tracing_subscriber::fmt()
        .with_env_filter("libxmedia=debug,xmedia=debug")
        .event_format(tracing_subscriber::fmt::format().pretty())
        .with_writer(non_blk)
        .init();
    let cli = Cli::parse();
    match execute(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.if_supports_color(Stderr, |text| text.red()));
            ExitCode::FAILURE
        }
    }
}
