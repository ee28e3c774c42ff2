//! Serve command - HTTP server.

use crate::config::Settings;

/// Run the serve command. `bind` overrides `server.bind` when given.
pub async fn run(config: Settings, bind: Option<String>) {
    let bind_address = bind.unwrap_or_else(|| config.server.bind.clone());

    tracing::info!(target: "http", "starting HTTP server on {bind_address}");
    tracing::debug!(
        target: "http",
        "search: match_count={} full_text_weight={} semantic_weight={} rrf_k={}",
        config.search.match_count,
        config.search.full_text_weight,
        config.search.semantic_weight,
        config.search.rrf_k
    );

    if let Err(e) = crate::server::serve(config, bind_address).await {
        eprintln!("HTTP server error: {e}");
        std::process::exit(1);
    }
}
