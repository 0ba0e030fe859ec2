// src/main.rs

use std::sync::Arc;

use loaddag::sink::MemorySink;
use loaddag::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("loaddag error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;

    // The bundled binary runs against the in-memory stub sink; a deployment
    // swaps in its warehouse-backed adapter here.
    let sink = Arc::new(MemorySink::new());

    let result = run(args, sink).await?;
    if !result.succeeded() {
        std::process::exit(1);
    }
    Ok(())
}
