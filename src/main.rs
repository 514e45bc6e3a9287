//! Демонстрационный подписчик keyroute.
//!
//! Открывает сессию, подписывается на ключевое выражение и печатает каждый
//! полученный сэмпл до Ctrl-C. С `--heartbeat` сессия сама публикует
//! сэмплы в подходящий ключ, так что вывод виден и без внешних линков.

use std::{path::PathBuf, time::Duration};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use keyroute::{init_logging, KeyExpr, ListenerResult, Sample, Session, Settings};
use tracing::{info, warn};

const DEFAULT_KEY: &str = "@/*/@mavlink/v2/out";

/// Аргументы командной строки
///
/// Транспорта у демо нет, поэтому `session.endpoints` в конфигурации
/// отклоняются при запуске.
#[derive(Parser, Debug)]
#[command(name = "keyroute-sub")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Print samples received on a key expression", long_about = None)]
struct Cli {
    /// Файл конфигурации (toml, yaml, json)
    #[arg(short, long, value_name = "FILE", env = "KEYROUTE_CONFIG")]
    config: Option<PathBuf>,
    /// Ключевое выражение подписки
    #[arg(short, long, value_name = "KEYEXPR", default_value = DEFAULT_KEY)]
    key: String,
    /// Публиковать heartbeat-сэмпл каждые N секунд
    #[arg(long, value_name = "SECS")]
    heartbeat: Option<u64>,
    /// Включить подробный вывод (debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("loading configuration")?;
    if cli.verbose {
        settings.logging.level = "debug".into();
    }
    check_settings(&settings)?;
    let logging = init_logging(settings.logging.clone()).context("initialising logging")?;

    let key = KeyExpr::parse(&cli.key)
        .with_context(|| format!("invalid key expression '{}'", cli.key))?;

    info!("Opening session...");
    let session = Session::open(settings.session).context("opening session")?;

    info!(key = %key, "Declaring Subscriber");
    let _subscriber = session.declare_subscriber(&key, |sample: Sample| -> ListenerResult {
        println!(
            ">> [Subscriber] Received {} ('{}': '{}')",
            sample.kind(),
            sample.key_expr(),
            String::from_utf8_lossy(sample.payload()),
        );
        Ok(())
    })?;

    if let Some(secs) = cli.heartbeat {
        let out = KeyExpr::concrete(&format!("@/{}/@mavlink/v2/out", session.id()))?;
        if !key.matches(&out) {
            warn!(key = %key, heartbeat = %out, "heartbeat key does not match the subscription");
        }
        let mut ticker = tokio::time::interval(Duration::from_secs(secs.max(1)));
        let mut n: u64 = 0;
        println!("Press CTRL-C to quit...");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    n += 1;
                    session.put(&out, format!("heartbeat {n}"))?;
                }
                res = tokio::signal::ctrl_c() => {
                    res?;
                    break;
                }
            }
        }
    } else {
        println!("Press CTRL-C to quit...");
        tokio::signal::ctrl_c().await?;
    }

    session.close();
    info!("Session closed");
    logging.shutdown();
    Ok(())
}

/// Проверяет, что настройки применимы без коннектора.
fn check_settings(settings: &Settings) -> Result<()> {
    ensure!(
        settings.session.endpoints.is_empty(),
        "keyroute-sub has no transport connector; remove session.endpoints ({}) from the configuration",
        settings.session.endpoints.join(", ")
    );
    Ok(())
}
