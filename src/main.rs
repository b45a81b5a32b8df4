//! Exposer Kubernetes Operator
//!
//! Watches Deployments and exposes the ones that opt in through annotations.
//!
//! ## Usage
//!
//! ```bash
//! # Run the operator (requires kubeconfig)
//! exposer-operator
//!
//! # Run with custom log level
//! RUST_LOG=debug exposer-operator
//! ```

use clap::Parser;
use exposer_operator::ExposureController;
use kube::Client;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Exposer Kubernetes Operator
#[derive(Parser, Debug)]
#[command(name = "exposer-operator")]
#[command(version, about = "Kubernetes operator exposing annotated Deployments")]
struct Args {
    /// Namespace to watch (empty for all namespaces)
    #[arg(long, default_value = "")]
    namespace: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let args = Args::parse();

    info!("Starting Exposer Kubernetes Operator");
    info!(
        "Watching namespace: {}",
        if args.namespace.is_empty() {
            "all"
        } else {
            &args.namespace
        }
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes API server");

    let namespace = if args.namespace.is_empty() {
        None
    } else {
        Some(args.namespace)
    };
    let controller = Arc::new(ExposureController::new(client, namespace));

    let controller_handle = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            if let Err(e) = controller.run().await {
                error!("Exposure controller error: {}", e);
            }
        })
    };

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = controller_handle => {
            if let Err(e) = result {
                error!("Exposure controller task failed: {}", e);
            }
        }
    }

    info!("Exposer Operator shutting down");
    Ok(())
}
