use crate::client::Client;
use crate::lifecycle::install_signal_handlers;
use crate::runtime_config::ServerConfig;
use crate::server::{render_file, render_once, Server};
use crate::supervisor::{Page, Supervisor};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Command-line interface for a page server process
///
/// Without a subcommand the page is rendered once, with no request, to
/// standard output.
#[derive(Parser, Debug)]
#[command(name = "gosp-server")]
#[command(about = "Serve Gosp pages over a Unix socket", long_about = None)]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Listen on a Unix socket and render one page per connection
    Serve {
        /// Path of the Unix socket to create
        #[arg(short, long, env = "GOSP_SOCKET")]
        socket: PathBuf,

        /// Exit after this many seconds without a connection (0 = never)
        #[arg(long)]
        idle_timeout_secs: Option<u64>,

        /// Deadline for reading a request, in milliseconds
        #[arg(long)]
        read_timeout_ms: Option<u64>,
    },
    /// Render the page once to standard output
    Render {
        /// JSON request to render; without it the page gets no request
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Ask a running server to shut down and print its process id
    Stop {
        /// Path of the server's Unix socket
        #[arg(short, long, env = "GOSP_SOCKET")]
        socket: PathBuf,
    },
}

/// Run the command line against `page`
///
/// Page crates call this from their `main` with their own page type; the
/// `gosp-server` binary uses [`crate::EchoPage`].
///
/// # Errors
///
/// Fails when the socket cannot be bound, the server stops on an accept
/// error, the request file cannot be read, or the shutdown message is not
/// acknowledged.
pub fn run_cli<P: Page>(cli: Cli, page: P) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Serve {
            socket,
            idle_timeout_secs,
            read_timeout_ms,
        }) => {
            let mut config = ServerConfig::from_env(socket);
            if let Some(secs) = idle_timeout_secs {
                config = config.with_idle_timeout(Duration::from_secs(secs));
            }
            if let Some(ms) = read_timeout_ms {
                config = config.with_read_timeout(Duration::from_millis(ms));
            }
            let server = Server::bind(config, page).context("failed to start page server")?;
            install_signal_handlers(server.shutdown_handle())
                .context("failed to install signal handlers")?;
            server.run().context("page server stopped with an error")
        }
        Some(Commands::Render { file }) => render_to_stdout(page, file),
        None => render_to_stdout(page, None),
        Some(Commands::Stop { socket }) => {
            let pid = Client::new(&socket)
                .shutdown()
                .with_context(|| format!("failed to stop server at {}", socket.display()))?;
            info!(pid, socket = %socket.display(), "Server acknowledged shutdown");
            println!("{pid}");
            Ok(())
        }
    }
}

fn render_to_stdout<P: Page>(page: P, file: Option<PathBuf>) -> anyhow::Result<()> {
    // Only the tuning knobs apply here; there is no socket.
    let config = ServerConfig::from_env(PathBuf::new());
    let supervisor = Supervisor::new(page)
        .with_stack_size(config.stack_size)
        .with_metadata_capacity(config.metadata_capacity);
    // Unlocked: the page runs on another thread and may print to stdout
    // itself while this thread waits on its metadata.
    let mut out = io::stdout();
    match file {
        Some(path) => {
            render_file(&supervisor, &path, &mut out)
                .with_context(|| format!("failed to render request file {}", path.display()))?;
        }
        None => {
            render_once(&supervisor, &mut out).context("failed to render page")?;
        }
    }
    out.flush().context("failed to flush standard output")
}
