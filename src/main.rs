use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use fabric::{build, cli, config};
use fabric_core::AuthContext;
use fabric_dispatch::DispatchOutcome;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".parse().unwrap());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = cli::Cli::parse();
    let mut config = config::Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if cli.psk.is_some() {
        config.psk = cli.psk.clone();
    }

    let gateway = build(&config);
    let shutdown = CancellationToken::new();

    let sweep_agents = gateway.agents.clone();
    let sweep_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(30));
        loop {
            tokio::select! {
                _ = interval.tick() => sweep_agents.sweep_health().await,
                _ = sweep_shutdown.cancelled() => break,
            }
        }
    });

    match cli.transport {
        cli::Transport::Http => run_http(gateway, config.port, shutdown).await,
        cli::Transport::Stdio => run_stdio(gateway, shutdown).await,
    }
}

async fn run_http(gateway: fabric::Gateway, port: u16, shutdown: CancellationToken) -> Result<()> {
    let app = fabric_gateway::router(gateway.state);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("binding {addr}"))?;
    info!("fabric gateway listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown.cancel();
        })
        .await
        .context("http server error")
}

/// A JSON-lines loop over stdin/stdout: one `{name, arguments}` request per
/// line, one `{ok, result|error, trace}` response per line. Streaming calls
/// are drained to completion and returned as a single `events` array rather
/// than framed incrementally — stdio has no notion of a long-lived
/// connection to promote to, unlike the HTTP surface's SSE path.
async fn run_stdio(gateway: fabric::Gateway, shutdown: CancellationToken) -> Result<()> {
    use futures_util::StreamExt;

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    let mut stdout = std::io::stdout();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = shutdown.cancelled() => break,
        };
        let Some(line) = line.context("reading stdin")? else { break };
        if line.trim().is_empty() {
            continue;
        }

        let request: serde_json::Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                warn!("stdio transport: malformed request: {}", e);
                continue;
            }
        };
        let name = request.get("name").and_then(serde_json::Value::as_str).unwrap_or_default();
        let arguments = request.get("arguments").cloned().unwrap_or(serde_json::Value::Null);

        let response = gateway.state.dispatch.handle(name, arguments, AuthContext::None, None).await;
        let body = match response.outcome {
            Ok(DispatchOutcome::Value(result)) => {
                serde_json::json!({"ok": true, "result": result, "trace": response.trace})
            }
            Ok(DispatchOutcome::Stream(events)) => {
                let collected: Vec<_> = events.collect().await;
                serde_json::json!({"ok": true, "result": {"events": collected}, "trace": response.trace})
            }
            Err(err) => {
                let body = fabric_core::ErrorBody::from(&err);
                serde_json::json!({"ok": false, "error": body, "trace": response.trace})
            }
        };

        writeln!(stdout, "{body}").context("writing stdout")?;
        stdout.flush().context("flushing stdout")?;
    }

    Ok(())
}
