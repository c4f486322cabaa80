// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `run` command.

use std::sync::Arc;

use tracing::{info, warn};

use uaq_config::UaqConfig;
use uaq_query::{MemoryConnection, QueryDataResponse, QueryDispatcher, SingleConnectionProvider};

use crate::cli::{Cli, RunArgs};
use crate::commands::{load_server, read_request};
use crate::error::{BinError, BinResult};

/// Executes the `run` command: dispatches a request against the fixture
/// server and prints the response.
pub async fn run(_cli: &Cli, config: &UaqConfig, args: RunArgs) -> BinResult<()> {
    let request = read_request(&args.request)?;
    let server = load_server(args.fixture.as_deref(), config)?;

    let connection = Arc::new(MemoryConnection::new(Arc::new(server)));
    let dispatcher = QueryDispatcher::new(Arc::new(SingleConnectionProvider::new(connection)))
        .with_options(config.dispatch_options());

    info!(
        queries = request.queries.len(),
        data_source = %request.plugin_context.data_source,
        "Dispatching request"
    );
    let response = dispatcher.query_data(&request).await;

    println!("{}", render_response(&response, args.pretty)?);

    if response.error_count() > 0 {
        warn!(
            errors = response.error_count(),
            answered = response.len(),
            "Some queries failed"
        );
    }
    Ok(())
}

/// Serializes a response to JSON text.
pub fn render_response(response: &QueryDataResponse, pretty: bool) -> BinResult<String> {
    let json = response.to_json();
    let text = if pretty {
        serde_json::to_string_pretty(&json)
    } else {
        serde_json::to_string(&json)
    };
    text.map_err(|e| BinError::runtime(format!("Failed to serialize response: {}", e)))
}
