use std::net::SocketAddr;

use futures::future::join_all;
use thiserror::Error;

use crate::api::server::RouteError;

mod ai;
mod api;
mod db;
mod scoring;
mod tasks;
mod util;

#[derive(Debug, Error)]
enum RunnerErr {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Route(#[from] RouteError),
}

type Result<T> = core::result::Result<T, RunnerErr>;

#[tokio::main]
async fn main() -> Result<()> {
    util::trace::init();

    tracing::info!("starting podium server");

    let (tx_server_ready, rx_server_ready) = tokio::sync::mpsc::unbounded_channel::<SocketAddr>();

    let handles = api::server::start_server(tx_server_ready, rx_server_ready).await?;

    _ = join_all(handles).await;

    Ok(())
}
