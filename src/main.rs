use clap::{
    builder::{IntoResettable, OsStr},
    Parser,
};
use flightsum::{
    config::Config,
    context::Context,
    flight::FlightData,
    llm::create_llm_client,
    util::fmt::ErrorChainDisplay,
};
use log::{debug, error, info, warn, LevelFilter};
use std::{
    io::{stdout, Write},
    path::PathBuf,
    process::exit,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("config error")]
    Config(
        #[from]
        #[source]
        flightsum::config::Error,
    ),
    #[error("failed to build prompt")]
    Context(
        #[from]
        #[source]
        flightsum::context::Error,
    ),
    #[error("failed to set ctrl-c handler")]
    Ctrlc(
        #[from]
        #[source]
        ctrlc::Error,
    ),
    #[error("flight data error")]
    Flight(
        #[from]
        #[source]
        flightsum::flight::Error,
    ),
    #[error("llm error")]
    Llm(
        #[from]
        #[source]
        flightsum::llm::Error,
    ),
}

#[derive(clap::Parser)]
struct Args {
    #[clap(long, short='c', help="Path to config", default_value=default_config_path())]
    config_path: PathBuf,
    #[clap(
        long,
        short = 'd',
        env = "FLIGHTSUM_DATA",
        help = "Path to flight data (overrides config)"
    )]
    data_path: Option<PathBuf>,
    #[clap(
        long,
        short = 'p',
        help = "Print the prompt only",
        default_value = "false"
    )]
    prompt_only: bool,
}

fn default_config_path() -> impl IntoResettable<OsStr> {
    #[cfg(unix)]
    let paths = vec![".", "$HOME/.config", "/etc"];

    #[cfg(windows)]
    let paths = vec![".", "$USERPROFILE", "$SystemDrive"];

    const BASENAME: &str = "flightsum.toml";
    for path in paths {
        let filename = PathBuf::from(path).join(BASENAME);
        let Ok(filename) = shellexpand::path::env(&filename) else {
            continue;
        };
        if filename.exists() {
            return filename.to_path_buf().into_os_string().into_resettable();
        }
    }
    BASENAME.into_resettable()
}

fn write_chunk(out: &mut impl Write, chunk: &str) -> std::io::Result<()> {
    out.write_all(chunk.as_bytes())?;
    out.flush()
}

fn run(args: Args) -> Result<(), Error> {
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .format_timestamp_millis()
        .parse_default_env()
        .init();

    let config = Config::read(&args.config_path)?;
    let data_path = args.data_path.unwrap_or(config.data_path);
    debug!("importing flight data from {}", data_path.display());
    let data = FlightData::import(&data_path)?;

    let prompt = Context::new().contextualize(&config.llm.prompt_fmt, &data.raw)?;
    if args.prompt_only {
        println!("{prompt}");
        return Ok(());
    }

    let llm = create_llm_client(&config.llm)?;

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel_cloned = cancel.clone();
        ctrlc::set_handler(move || {
            warn!("received cancelling request");
            cancel_cloned.store(true, Ordering::SeqCst);
        })?;
    }

    let started = Instant::now();
    let mut output_failed = false;
    let generation = llm.generate(&prompt, cancel.clone(), &mut |chunk| {
        if output_failed {
            return;
        }
        if let Err(err) = write_chunk(&mut stdout().lock(), chunk) {
            warn!("failed to write response: {}", ErrorChainDisplay(&err));
            output_failed = true;
            cancel.store(true, Ordering::SeqCst);
        }
    })?;
    println!();

    let elapsed = started.elapsed();
    match generation.total_duration {
        Some(server) => info!("ollama job finished in {elapsed:?} (server reported {server:?})"),
        None => info!("ollama job finished in {elapsed:?}"),
    }
    if let Some(tokens) = generation.eval_count {
        debug!("generated {tokens} tokens");
    }

    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(args) {
        error!("{}", ErrorChainDisplay(&err));
        exit(1);
    }
}
