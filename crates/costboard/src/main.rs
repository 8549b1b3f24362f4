use std::path::{Path, PathBuf};

use env_flags::env_flags;
use once_cell::sync::OnceCell;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::Layered;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use costboard::api::HttpPricingApi;
use costboard::config::{self, EnvOverrides, Settings, UserConfig};
use costboard::registry::ProviderRegistry;
use costboard::session::Session;
use costboard::shell;
use costboard::store::JsonFileStore;

#[derive(Debug, Clone, Copy)]
enum LogStyle {
    Json,
    Compact,
    Pretty,
    Full,
}

type FilteredRegistry = Layered<EnvFilter, Registry>;

fn fmt_layer<W>(style: LogStyle, writer: W, ansi: bool) -> Box<dyn Layer<FilteredRegistry> + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let base = tracing_subscriber::fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_target(true)
        .with_ansi(ansi)
        .with_writer(writer);
    match style {
        LogStyle::Json => base.json().boxed(),
        LogStyle::Compact => base.compact().boxed(),
        LogStyle::Pretty => base.pretty().boxed(),
        LogStyle::Full => base.boxed(),
    }
}

fn resolve_home(explicit: &str) -> PathBuf {
    if !explicit.is_empty() {
        return config::expand_home(explicit);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".costboard");
    }
    // Fallback: current dir /.costboard
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".costboard")
}

fn init_tracing(home: &Path, user_cfg: Option<&UserConfig>) {
    env_flags! {
        /// Tracing filter, e.g. "info", "debug", or targets format.
        RUST_LOG: &str = "warn";
        /// Preferred filter env (alias). If set, overrides RUST_LOG.
        TRACING_FILTER: &str = "";
        /// Pretty formatting for logs (ignored if TRACING_JSON=true).
        TRACING_PRETTY: bool = false;
        /// Compact single-line formatting for logs (ignored if TRACING_JSON=true)
        TRACING_COMPACT: bool = true;
        /// JSON formatting for logs
        TRACING_JSON: bool = false;
        /// If true, also log to file under <COSTBOARD_HOME>/logs or LOG_DIR
        LOG_TO_FILE: bool = false;
        /// Optional explicit log directory. Defaults to <COSTBOARD_HOME>/logs
        LOG_DIR: &str = "";
    }

    use tracing_subscriber::prelude::*;

    let env_set = |k: &str| std::env::var_os(k).is_some();

    let mut rust_log = if !(*TRACING_FILTER).is_empty() {
        (*TRACING_FILTER).to_string()
    } else {
        (*RUST_LOG).to_string()
    };
    let mut tracing_json = *TRACING_JSON;
    let mut tracing_compact = *TRACING_COMPACT;
    let mut tracing_pretty = *TRACING_PRETTY;
    let mut log_to_file = *LOG_TO_FILE;
    let mut log_dir = (!(*LOG_DIR).is_empty()).then(|| config::expand_home(*LOG_DIR));

    if let Some(cfg) = user_cfg.and_then(|c| c.logging.as_ref()) {
        if !(env_set("TRACING_FILTER") || env_set("RUST_LOG"))
            && let Some(level) = cfg.level.as_ref()
        {
            rust_log = level.clone();
        }
        if !env_set("TRACING_JSON")
            && let Some(v) = cfg.json
        {
            tracing_json = v;
        }
        if !env_set("TRACING_COMPACT")
            && let Some(v) = cfg.compact
        {
            tracing_compact = v;
        }
        if !env_set("TRACING_PRETTY")
            && let Some(v) = cfg.pretty
        {
            tracing_pretty = v;
        }
        if !env_set("LOG_TO_FILE")
            && let Some(v) = cfg.to_file
        {
            log_to_file = v;
        }
        if !env_set("LOG_DIR")
            && let Some(dir) = cfg.dir.as_ref()
        {
            log_dir = Some(config::expand_home(dir));
        }
    }

    let style = if tracing_json {
        LogStyle::Json
    } else if tracing_compact {
        LogStyle::Compact
    } else if tracing_pretty {
        LogStyle::Pretty
    } else {
        LogStyle::Full
    };

    let filter = EnvFilter::try_new(rust_log).unwrap_or_else(|_| EnvFilter::new("warn"));

    // Logs always go to stderr; stdout belongs to the shell.
    let mut layers = vec![fmt_layer(style, std::io::stderr, true)];
    static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();
    let mut dir_error = None;
    if log_to_file {
        let dir = log_dir.unwrap_or_else(|| home.join("logs"));
        match std::fs::create_dir_all(&dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(dir, "costboard.log");
                let (nb, guard) = tracing_appender::non_blocking(appender);
                let _ = FILE_GUARD.set(guard);
                layers.push(fmt_layer(style, nb, false));
            }
            Err(e) => dir_error = Some((dir, e)),
        }
    }

    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(layers)
        .try_init()
    {
        tracing::debug!("tracing already set: {:?}", e);
    }
    if let Some((dir, e)) = dir_error {
        tracing::warn!("failed to create log dir {}: {}", dir.display(), e);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_flags! {
        /// Costboard home directory. Defaults to $HOME/.costboard
        COSTBOARD_HOME: &str = "";
        /// Pricing backend base URL
        COSTBOARD_API_URL: &str = "";
        /// Per-request timeout in seconds
        COSTBOARD_API_TIMEOUT_SECS: u64 = 30;
        /// Custom provider store. Defaults to <COSTBOARD_HOME>/store.json
        COSTBOARD_STORE: &str = "";
        /// Initial token counts
        COSTBOARD_INPUT_TOKENS: u64 = 1000;
        COSTBOARD_OUTPUT_TOKENS: u64 = 500;
    }

    let home = resolve_home(*COSTBOARD_HOME);
    let (user_cfg, cfg_error) = match config::load_user_config(&home) {
        Ok(cfg) => (cfg, None),
        Err(e) => (None, Some(e)),
    };
    init_tracing(&home, user_cfg.as_ref());
    if let Some(e) = cfg_error {
        tracing::warn!("ignoring {}: {}", home.join("config.toml").display(), e);
    }
    tracing::info!("costboard_home={}", home.display());

    let env_set = |k: &str| std::env::var_os(k).is_some();
    let non_empty = |v: &str| (!v.is_empty()).then(|| v.to_string());
    let overrides = EnvOverrides {
        api_url: non_empty(*COSTBOARD_API_URL),
        timeout_secs: env_set("COSTBOARD_API_TIMEOUT_SECS").then_some(*COSTBOARD_API_TIMEOUT_SECS),
        store: non_empty(*COSTBOARD_STORE),
        input_tokens: env_set("COSTBOARD_INPUT_TOKENS").then_some(*COSTBOARD_INPUT_TOKENS),
        output_tokens: env_set("COSTBOARD_OUTPUT_TOKENS").then_some(*COSTBOARD_OUTPUT_TOKENS),
    };
    let settings = Settings::resolve(&home, user_cfg.as_ref(), &overrides);
    tracing::info!(
        "starting costboard (api={}, store={})",
        settings.api_url,
        settings.store_path.display()
    );

    let api = HttpPricingApi::new(&settings.api_url, settings.timeout)?;
    let store = JsonFileStore::new(settings.store_path.clone());
    let registry = ProviderRegistry::load(Box::new(store));
    let mut session = Session::new(Box::new(api), registry, settings.tokens);

    if let Err(e) = session.refresh_pricing().await {
        println!("could not load pricing from {}: {}", settings.api_url, e);
    }
    if let Err(e) = session.refresh_benchmark_table().await {
        println!("could not load benchmark table: {}", e);
    }
    println!("type 'help' for commands");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    shell::run(&mut session, stdin, &mut stdout).await?;
    tracing::info!("costboard exiting");
    Ok(())
}
