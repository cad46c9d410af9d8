use componentstatus_exporter::config::Config;
use componentstatus_exporter::controller::{Classifier, KubeStatusSource, Poller};
use componentstatus_exporter::logging;
use componentstatus_exporter::server::{
    create_metrics, run_metrics_server, shutdown_channel, ReadinessState, SignalListener,
};
use kube::Client;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Configuration errors are fatal before anything starts
    let config = Config::from_env()?;
    logging::init(&config)?;

    // Before any slow startup work, so an early SIGTERM still exits cleanly
    let mut signals = match SignalListener::install() {
        Ok(signals) => signals,
        Err(e) => {
            error!(error = %e, "Failed to install signal handlers");
            return Err(e.into());
        }
    };

    info!(
        check_rate_secs = config.check_rate.as_secs(),
        health_signal = config.health_signal.as_str(),
        reporting = config.reporting.as_str(),
        job_label = %config.job_label,
        metrics_port = config.metrics_port,
        "Starting componentstatus exporter"
    );

    let (shutdown_controller, shutdown_signal) = shutdown_channel();
    let readiness = ReadinessState::for_check_rate(config.check_rate);

    let metrics = create_metrics(config.health_signal, config.reporting, &config.job_label)?;
    info!("Prometheus metrics registry initialized");

    let client = tokio::select! {
        client = Client::try_default() => match client {
            Ok(c) => c,
            Err(e) => {
                error!(error = %e, "Failed to create Kubernetes client");
                return Err(e.into());
            }
        },
        signal = signals.recv() => {
            info!(signal, "Terminating before startup completed");
            return Ok(());
        }
    };
    info!("Connected to Kubernetes cluster");

    let mut server_handle = tokio::spawn(run_metrics_server(
        config.metrics_port,
        readiness.clone(),
        metrics.clone(),
    ));

    let poller = Poller::new(
        Arc::new(KubeStatusSource::new(client)),
        metrics,
        Classifier::new(config.health_signal),
        config.check_rate,
    )
    .with_readiness(readiness.clone());
    let mut poll_handle = tokio::spawn(poller.run(shutdown_signal));

    let outcome: anyhow::Result<()> = tokio::select! {
        result = &mut poll_handle => match result {
            Ok(Ok(())) => {
                info!("Poll loop ended");
                Ok(())
            }
            Ok(Err(e)) => {
                error!(error = %e, "Component status polling failed, exiting");
                Err(e.into())
            }
            Err(e) => Err(anyhow::anyhow!("poll task failed: {}", e)),
        },
        result = &mut server_handle => match result {
            Ok(Ok(())) => Err(anyhow::anyhow!("metrics server stopped unexpectedly")),
            Ok(Err(e)) => {
                error!(error = %e, "Metrics server failed, exiting");
                Err(e.into())
            }
            Err(e) => Err(anyhow::anyhow!("metrics server task failed: {}", e)),
        },
        signal = signals.recv() => {
            info!(signal, "Terminating");
            readiness.set_not_ready();
            Ok(())
        },
    };

    // In-flight API calls are dropped, not drained
    shutdown_controller.shutdown();
    poll_handle.abort();
    server_handle.abort();

    if outcome.is_ok() {
        info!("componentstatus exporter stopped");
    }
    outcome
}
