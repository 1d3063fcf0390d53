//! Measures one page and prints the resource breakdown.
//!
//! Expects an automation endpoint already listening, e.g.:
//!
//! ```sh
//! cargo run --example measure -- ws://127.0.0.1:9222/session https://example.com
//! ```

use std::sync::Arc;

use page_meter::{AnalysisOptions, Analyzer, Connection, InteractionLevel, Result, Session};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "page_meter=info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let endpoint = args
        .next()
        .unwrap_or_else(|| "ws://127.0.0.1:9222/session".to_string());
    let url = args
        .next()
        .unwrap_or_else(|| "https://example.com".to_string());

    let connection = Connection::connect(&endpoint).await?;
    let session = Session::over(Arc::new(connection));

    let page = session.primary_page();
    let analyzer = Analyzer::new(Arc::new(session));

    let options = AnalysisOptions {
        interaction_level: InteractionLevel::Standard,
        ..AnalysisOptions::default()
    };

    let report = analyzer.run(&page, &url, &options).await?;

    println!("{url}");
    println!(
        "  {} resources, {} bytes total",
        report.resources.count(),
        report.resources.total_transfer_size()
    );
    for (kind, bytes) in report.resources.size_by_type() {
        println!("  {kind:>6}: {bytes} bytes");
    }
    println!(
        "  interactions: {}/{} succeeded, network activity: {}",
        report.simulation.successful_interactions,
        report.simulation.total_interactions,
        report.simulation.network_activity
    );

    Ok(())
}
