use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use memidx::bench::{self, SearchLoadConfig};
use memidx::client::ApiClient;
use memidx::server::{self, SearchService};
use memidx::utils::config::Config;
use memidx::utils::tokenizer::Tokenizer;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Exit code for transport-level failures when talking to a server.
const EXIT_NETWORK: i32 = 10;
/// Exit code when a determinism verification finds a mismatch.
const EXIT_VERIFY_MISMATCH: i32 = 3;
/// Exit code for an invocation that is syntactically fine but unusable.
const EXIT_BAD_INVOCATION: i32 = 2;

#[derive(Parser)]
#[command(name = "memidx")]
#[command(about = "In-memory text search service", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP search service
    Serve {
        /// Config file (KEY=VALUE lines); missing file is fine
        #[arg(long, default_value = "config.env")]
        config: PathBuf,
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Dataset directory for build requests and the scheduler
        #[arg(long)]
        dataset: Option<String>,
        /// Default worker count for builds
        #[arg(long)]
        threads: Option<usize>,
        /// Enable the periodic incremental rebuilder at startup
        #[arg(long)]
        scheduler: bool,
        #[arg(long)]
        interval_s: Option<u64>,
        #[arg(long)]
        log_level: Option<String>,
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// Print /status of a running server
    Status {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Run a query against a running server
    Search {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[arg(long)]
        q: String,
        #[arg(long)]
        topk: Option<usize>,
    },
    /// Start a build on a running server
    Build {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[arg(long)]
        dataset: String,
        #[arg(long, default_value_t = 4)]
        threads: usize,
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        incremental: bool,
    },
    /// Toggle the periodic rebuild scheduler on a running server
    Scheduler {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[arg(long, action = ArgAction::Set)]
        enabled: bool,
        #[arg(long)]
        interval_s: Option<u64>,
    },
    /// Load-test a server or verify build determinism
    Bench {
        #[arg(long, value_enum, default_value_t = BenchMode::Search)]
        mode: BenchMode,
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8080)]
        port: u16,
        /// Concurrent client threads (search mode)
        #[arg(long, default_value_t = 50)]
        clients: usize,
        #[arg(long, default_value_t = 10)]
        duration_s: u64,
        #[arg(long, default_value = "hello")]
        q: String,
        #[arg(long, default_value_t = 20)]
        topk: usize,
        /// Dataset directory (build and verify modes)
        #[arg(long)]
        dataset: Option<PathBuf>,
        #[arg(long, default_value = "1,2,4,8")]
        threads_list: String,
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BenchMode {
    Search,
    Build,
    Verify,
}

fn main() {
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            1
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Serve {
            config,
            host,
            port,
            dataset,
            threads,
            scheduler,
            interval_s,
            log_level,
            log_file,
        } => {
            let mut cfg = Config::new();
            cfg.load_file(&config);

            // Precedence: environment > config file > CLI flag > builtin.
            let host = cfg.get_string("HOST", &host.unwrap_or_else(|| "0.0.0.0".into()));
            let port = cfg.get_u16("PORT", port.unwrap_or(8080));
            let dataset = cfg.get_string("DATASET_PATH", &dataset.unwrap_or_default());
            let threads = cfg.get_usize("BUILD_THREADS", threads.unwrap_or(4));
            let sched_enabled = cfg.get_bool("SCHED_ENABLED", scheduler);
            let sched_interval = cfg.get_u64("SCHED_INTERVAL_S", interval_s.unwrap_or(30));
            let log_level =
                cfg.get_string("LOG_LEVEL", &log_level.unwrap_or_else(|| "info".into()));
            let log_file = cfg
                .get_opt("LOG_FILE")
                .map(PathBuf::from)
                .or(log_file)
                .filter(|p| !p.as_os_str().is_empty());

            init_logging(&log_level, log_file.as_deref())?;

            let service = Arc::new(SearchService::new(
                Tokenizer::default(),
                dataset,
                threads,
                sched_enabled,
                sched_interval,
            ));

            let _scheduler = server::scheduler::spawn(Arc::clone(&service));
            server::run_blocking(service, &host, port)?;
            Ok(0)
        }

        Commands::Status { host, port } => print_api(|| ApiClient::new(&host, port)?.status()),

        Commands::Search { host, port, q, topk } => {
            print_api(|| ApiClient::new(&host, port)?.search(&q, topk))
        }

        Commands::Build {
            host,
            port,
            dataset,
            threads,
            incremental,
        } => print_api(|| ApiClient::new(&host, port)?.build(&dataset, threads, incremental)),

        Commands::Scheduler {
            host,
            port,
            enabled,
            interval_s,
        } => print_api(|| ApiClient::new(&host, port)?.scheduler(Some(enabled), interval_s)),

        Commands::Bench {
            mode,
            host,
            port,
            clients,
            duration_s,
            q,
            topk,
            dataset,
            threads_list,
            csv,
        } => match mode {
            BenchMode::Search => {
                let cfg = SearchLoadConfig {
                    host,
                    port,
                    clients: clients.max(1),
                    duration_s: duration_s.max(1),
                    q,
                    topk,
                    csv,
                };
                bench::run_search_load(&cfg)?;
                Ok(0)
            }
            BenchMode::Build => {
                let Some(dataset) = dataset else {
                    eprintln!("missing --dataset for build mode");
                    return Ok(EXIT_BAD_INVOCATION);
                };
                bench::run_build_matrix(&dataset, &bench::parse_threads_list(&threads_list), csv.as_deref())?;
                Ok(0)
            }
            BenchMode::Verify => {
                let Some(dataset) = dataset else {
                    eprintln!("missing --dataset for verify mode");
                    return Ok(EXIT_BAD_INVOCATION);
                };
                let ok = bench::run_verify(&dataset, &bench::parse_threads_list(&threads_list));
                Ok(if ok { 0 } else { EXIT_VERIFY_MISMATCH })
            }
        },
    }
}

/// Run a client call and print its raw JSON body; transport failures map to
/// the network exit code instead of a generic error.
fn print_api(call: impl FnOnce() -> Result<String>) -> Result<i32> {
    match call() {
        Ok(body) => {
            println!("{body}");
            Ok(0)
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            Ok(EXIT_NETWORK)
        }
    }
}

fn init_logging(level: &str, log_file: Option<&std::path::Path>) -> Result<()> {
    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}
