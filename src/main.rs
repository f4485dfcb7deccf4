use std::{process, sync::Arc, time::Duration};

use clap::Parser;
use log::{error, warn};

use dining::{
    observer::{Observer, Printer, Rendezvous, Silent},
    signal::spawn_status_dump,
    watchdog::{self, Outcome},
    Config, Strategy, Table,
};

#[derive(Parser, Debug)]
#[command(name = "dining", about = "Dining philosophers around a ring of forks")]
struct Cli {
    /// Number of philosophers (and forks)
    #[arg(short = 'n', long, default_value_t = 5)]
    philosophers: usize,

    /// Meals per philosopher
    #[arg(short, long, default_value_t = 3)]
    meals: usize,

    /// Thinking time in milliseconds
    #[arg(long, default_value_t = 1000)]
    think_ms: u64,

    /// Eating time in milliseconds
    #[arg(long, default_value_t = 2000)]
    eat_ms: u64,

    /// How forks are picked up
    #[arg(short, long, value_enum, default_value_t = Strategy::Naive)]
    strategy: Strategy,

    /// Give up and report a deadlock after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Make everyone hold their first fork before anyone reaches for the second
    #[arg(long)]
    rendezvous: bool,

    /// Do not print progress lines
    #[arg(short, long)]
    quiet: bool,
}

const EXIT_CONFIG: i32 = 2;
const EXIT_DEADLOCK: i32 = 3;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let config = Config {
        philosophers: cli.philosophers,
        meals: cli.meals,
        think: Duration::from_millis(cli.think_ms),
        eat: Duration::from_millis(cli.eat_ms),
        strategy: cli.strategy,
    };
    // Rendezvous は席数が正しいことを前提にしているので先に検証する
    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        process::exit(EXIT_CONFIG);
    }

    let mut observer: Arc<dyn Observer> = if cli.quiet {
        Arc::new(Silent)
    } else {
        Arc::new(Printer)
    };
    if cli.rendezvous {
        observer = Arc::new(Rendezvous::for_strategy(
            config.strategy,
            config.philosophers,
            observer,
        ));
    }

    let table = match Table::with_observer(config, observer) {
        Ok(table) => Arc::new(table),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(EXIT_CONFIG);
        }
    };

    // kill -USR1 <pid> で様子を見る
    if let Err(e) = spawn_status_dump(table.clone(), |status| print!("{status}")) {
        warn!("status dump is not available: {e}");
    }

    match cli.timeout_secs {
        Some(secs) => match watchdog::run(table, Duration::from_secs(secs)).await {
            Outcome::Completed(_) => {}
            Outcome::Deadlocked(status) => {
                eprintln!("deadlock: no progress within {secs}s");
                eprint!("{status}");
                process::exit(EXIT_DEADLOCK);
            }
            Outcome::Aborted => {
                error!("a philosopher panicked");
                process::exit(1);
            }
        },
        // ワーカスレッドを占有しないように spawn_blocking で待つ
        None => {
            if let Err(e) = tokio::task::spawn_blocking(move || table.run()).await {
                error!("dinner aborted: {e}");
                process::exit(1);
            }
        }
    }
}
