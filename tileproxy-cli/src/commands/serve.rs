//! Serve command - run the caching proxy until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use tileproxy::proxy::{Interceptor, PassThrough};
use tileproxy::server;
use tracing::{info, warn};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the serve command.
pub struct ServeArgs {
    pub listen: Option<SocketAddr>,
    pub no_cache: bool,
    pub debug: bool,
}

/// Run the serve command.
pub fn run(args: ServeArgs) -> Result<(), CliError> {
    let runner = CliRunner::with_debug(args.debug)?;
    runner.log_startup("serve");
    runner.block_on(serve(&runner, args))
}

async fn serve(runner: &CliRunner, args: ServeArgs) -> Result<(), CliError> {
    let config = runner.config();
    let listen = args.listen.unwrap_or(config.server.listen);
    let origin = config.proxy.origin.clone();
    let transport = runner.create_transport()?;

    let listener = server::bind(listen).await?;

    if args.no_cache {
        println!("Caching disabled, forwarding all requests");
        println!("Listening on http://{}", listen);
        let interceptor: Arc<dyn Interceptor> = Arc::new(PassThrough::new(transport));
        server::serve(listener, interceptor, origin, shutdown_signal()).await?;
        return Ok(());
    }

    let service = runner.start_service(transport).await?;
    let store = Arc::clone(service.proxy().store());
    println!(
        "Caching {} in generation '{}' ({}/{} entries)",
        origin,
        store.generation(),
        store.len(),
        store.capacity()
    );
    println!("Listening on http://{}", listen);
    println!("Press Ctrl-C to stop.");

    let result = server::serve(listener, service.interceptor(), origin, shutdown_signal()).await;

    println!("Shutting down...");
    let stats = service.stats();
    service.shutdown().await;
    println!("{}", stats);

    result.map_err(CliError::from)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => {
            warn!(error = %e, "Could not listen for Ctrl-C, serving until killed");
            std::future::pending::<()>().await;
        }
    }
}
