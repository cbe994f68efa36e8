use std::io::Read;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use kampfbericht::api;
use kampfbericht::options::{parse_group_by, parse_order, ReportOptions, DEFAULT_ACTION_POINTS};
use kampfbericht::report::{default_order, order_report, Direction, SortKey};
use kampfbericht::{analyse, KampfberichtError, Result};

const PORT: u16 = 3000;

#[derive(Parser)]
#[command(version, about = "Statistics for Kampfbericht battle reports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        #[arg(short, long, env = "KAMPFBERICHT_PORT", default_value_t = PORT)]
        port: u16,
        #[arg(long, default_value = "0.0.0.0")]
        bind: IpAddr,
    },
    /// Analyse one report and print it as JSON
    Report {
        /// Report file, `-` reads stdin
        file: PathBuf,
        /// Comma separated grouping fields, outermost first
        #[arg(short, long, default_value = "participant,weapon,target")]
        group_by: String,
        #[arg(long)]
        show_bandaging: bool,
        #[arg(long, default_value_t = DEFAULT_ACTION_POINTS)]
        ap_per_round: u32,
        /// Sort keys like `dmg:desc,miss_percent:asc`
        #[arg(short, long)]
        order: Option<String>,
        #[arg(long)]
        pretty: bool,
    },
}

fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_input(file: &Path) -> Result<String> {
    let read = if file.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text).map(|_| text)
    } else {
        std::fs::read_to_string(file)
    };
    read.map_err(|source| KampfberichtError::ReadInput {
        path: file.to_path_buf(),
        source,
    })
}

fn report(
    file: &Path,
    options: &ReportOptions,
    order: Option<&str>,
    pretty: bool,
) -> Result<String> {
    let order: Vec<(SortKey, Direction)> = match order {
        Some(text) => parse_order(text)?.into_iter().map(Into::into).collect(),
        None => default_order(),
    };
    let text = read_input(file)?;

    let mut analysis = analyse(&text, options);
    analysis.report = order_report(&analysis.report, &order);

    let json = if pretty {
        serde_json::to_string_pretty(&analysis)?
    } else {
        serde_json::to_string(&analysis)?
    };
    Ok(json)
}

async fn serve(addr: SocketAddr) -> Result<()> {
    let app = api::create_router(ReportOptions::default());
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| KampfberichtError::Bind { addr, source })?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutting down");
        })
        .await
        .map_err(KampfberichtError::Serve)
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve { port, bind } => {
            let rt = tokio::runtime::Runtime::new().map_err(KampfberichtError::Serve)?;
            rt.block_on(serve(SocketAddr::new(bind, port)))
        }
        Commands::Report {
            file,
            group_by,
            show_bandaging,
            ap_per_round,
            order,
            pretty,
        } => {
            let options = ReportOptions {
                group_by: parse_group_by(&group_by)?,
                show_bandaging,
                action_points_per_round: ap_per_round,
            };
            let json = report(&file, &options, order.as_deref(), pretty)?;
            println!("{json}");
            Ok(())
        }
    }
}

fn main() {
    init_logging();

    if let Err(e) = run(Cli::parse()) {
        error!(error = %e, "kampfbericht failed");
        std::process::exit(1);
    }
}
