//! Entry point for **zentile**.
//!
//! Without command words this runs the daemon: the socket server and the
//! Hyprland event source run on background threads while the main thread
//! owns the tiling state and drains the mailbox.  With command words it
//! sends them to a running daemon and exits with the client status.

use clap::Parser;
use log::{error, info, warn, LevelFilter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use zentile::cli::{self, Args};
use zentile::config::Config;
use zentile::daemon::Daemon;
use zentile::hyprland::events::HyprlandEvents;
use zentile::hyprland::wm::HyprlandWm;
use zentile::ipc::listener::SocketServer;

/// Resolve the config directory (`$XDG_CONFIG_HOME/zentile`).
fn config_dir() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    PathBuf::from(base).join("zentile")
}

/// Load the config from `path` (or `$XDG_CONFIG_HOME/zentile/config.json`),
/// falling back to compiled-in defaults.
///
/// On first run the default location is seeded with the defaults.
fn load_config(path: Option<&Path>) -> Config {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let path = config_dir().join("config.json");
            match Config::write_default(&path) {
                Ok(true) => info!("wrote default config to {}", path.display()),
                Ok(false) => {}
                Err(e) => warn!("{}", e),
            }
            path
        }
    };
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Config::default()
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .parse_default_env()
        .init();

    let config = load_config(args.config.as_deref());
    let socket = args
        .socket
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.socket_path));

    if args.is_daemon() {
        run_daemon(&config, &socket)
    } else {
        cli::run(&socket, &args.command, &mut std::io::stdout()).into()
    }
}

/// Normal daemon mode.  Only returns on a fatal startup error.
fn run_daemon(config: &Config, socket: &Path) -> ExitCode {
    // Bind first: a second instance must fail before it registers any chord.
    let server = match SocketServer::bind(socket) {
        Ok(server) => server,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let wm = HyprlandWm::new(config.gap, config.workspaces, config.remove_decorations);
    let daemon = Daemon::new(wm, config);
    daemon.spawn_server(server);
    daemon.spawn_source(HyprlandEvents::new());

    daemon.run();
    ExitCode::SUCCESS
}
