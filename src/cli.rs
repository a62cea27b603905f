use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use reminderd::config::{AppConfig, PermissionPolicy};
use reminderd::push::{DEFAULT_APPLICATION_SERVER_KEY, SchedulePolicy};
use reminderd::types::notify::NotificationDefaults;
use std::net::SocketAddr;
use std::path::PathBuf;

const STORE_FILE_NAME: &str = "settings.toml";

#[allow(clippy::large_enum_variant)]
pub(crate) enum RunOutcome {
    Serve(SocketAddr, AppConfig),
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    if let Some(Command::Init) = cli.command {
        run_init();
        return RunOutcome::Exit(0);
    }

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return RunOutcome::Exit(2);
        }
    };
    RunOutcome::Serve(cli.listen, config)
}

#[derive(Parser, Debug)]
#[command(
    name = "reminderd",
    version,
    about = "Daily and weekly reminder notifications with a small settings API"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[arg(long, env = "REMINDERD_LISTEN", default_value = "127.0.0.1:3000")]
    listen: SocketAddr,
    #[arg(long, env = "REMINDERD_STORE")]
    store: Option<PathBuf>,
    #[arg(long, env = "REMINDERD_APP_NAME", default_value = "Reminderd")]
    app_name: String,
    #[arg(long, env = "REMINDERD_APPLICATION_SERVER_KEY")]
    application_server_key: Option<String>,
    #[arg(long, env = "REMINDERD_ICON")]
    icon: Option<String>,
    #[arg(long, env = "REMINDERD_BADGE")]
    badge: Option<String>,
    #[arg(long, env = "REMINDERD_SCHEDULE_POLICY", default_value = "next-occurrence")]
    schedule_policy: SchedulePolicy,
    #[arg(long, env = "REMINDERD_PERMISSION_POLICY", default_value = "grant")]
    permission_policy: PermissionPolicy,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a fresh application server key.
    Init,
}

fn run_init() {
    let key = reminderd::generate_application_server_key();
    println!("REMINDERD_APPLICATION_SERVER_KEY=\"{key}\"");
}

fn resolve_config(cli: &Cli) -> Result<AppConfig, String> {
    let app_name = cli.app_name.trim();
    if app_name.is_empty() {
        return Err("app name cannot be empty".to_string());
    }

    let application_server_key = match cli.application_server_key.as_deref() {
        Some(key) => {
            let key = key.trim();
            reminderd::push::decode_application_server_key(key).map_err(|err| err.to_string())?;
            key.to_string()
        }
        None => DEFAULT_APPLICATION_SERVER_KEY.to_string(),
    };

    let mut notification_defaults = NotificationDefaults::default();
    if let Some(icon) = non_empty(cli.icon.as_deref()) {
        notification_defaults.icon = Some(icon);
    }
    if let Some(badge) = non_empty(cli.badge.as_deref()) {
        notification_defaults.badge = Some(badge);
    }

    Ok(AppConfig {
        app_name: app_name.to_string(),
        store_path: resolve_store_path(cli.store.as_ref()),
        application_server_key,
        notification_defaults,
        schedule_policy: cli.schedule_policy,
        permission_policy: cli.permission_policy,
    })
}

fn resolve_store_path(store: Option<&PathBuf>) -> PathBuf {
    if let Some(path) = store {
        return path.clone();
    }
    match ProjectDirs::from("dev", "reminderd", "reminderd") {
        Some(dirs) => dirs.config_dir().join(STORE_FILE_NAME),
        None => PathBuf::from(STORE_FILE_NAME),
    }
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
