//! Fetch command - send GET requests through an in-process proxy.
//!
//! Useful for checking that a URL is classified and cached as expected:
//! with `--repeat 2` a cacheable tile shows a network fetch followed by a
//! cache hit.

use std::time::Instant;

use tileproxy::http::ProxyRequest;
use tileproxy::proxy::{Interceptor, StatsSnapshot};

use super::common::format_size;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the fetch command.
pub struct FetchArgs {
    pub url: String,
    pub repeat: u32,
    pub debug: bool,
}

/// Where a response came from, judged by which counter moved.
fn response_source(before: &StatsSnapshot, after: &StatsSnapshot) -> &'static str {
    if after.hits > before.hits {
        "cache"
    } else if after.pass_through > before.pass_through {
        "pass-through"
    } else {
        "network"
    }
}

/// Run the fetch command.
pub fn run(args: FetchArgs) -> Result<(), CliError> {
    let runner = CliRunner::with_debug(args.debug)?;
    runner.log_startup("fetch");
    runner.block_on(fetch(&runner, args))
}

async fn fetch(runner: &CliRunner, args: FetchArgs) -> Result<(), CliError> {
    let request = ProxyRequest::get(&args.url)?;
    let transport = runner.create_transport()?;

    let service = runner.start_service(transport).await?;
    let proxy = service.proxy();
    println!("{} {:?}", request.url().path(), proxy.classify(&request));

    let mut outcome = Ok(());
    for attempt in 1..=args.repeat {
        let before = proxy.stats();
        let started = Instant::now();

        let response = match proxy.handle(request.clone()).await {
            Ok(response) => response,
            Err(e) => {
                outcome = Err(CliError::from(e));
                break;
            }
        };
        // Let the write land so the next attempt can hit.
        proxy.flush().await;

        println!(
            "#{}: {} {} in {:.1?} ({})",
            attempt,
            response.status(),
            format_size(response.body().len() as u64),
            started.elapsed(),
            response_source(&before, &proxy.stats())
        );
    }

    println!("{}", proxy.stats());
    service.shutdown().await;
    outcome
}
