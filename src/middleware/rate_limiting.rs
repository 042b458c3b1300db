// ABOUTME: Per-address request throttle applied before authentication
// ABOUTME: Rejects over-budget clients with 429 and a Retry-After header
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::logging::AppLogger;
use crate::resources::ServerResources;

/// Client address from the connection, or the unspecified address when the
/// server was not started with connect info
fn client_addr(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |info| info.0.ip())
}

/// Count the request against its address and stop it when over budget
///
/// Runs for every route, signed in or not. A store failure fails the request.
pub async fn ip_rate_limit(
    State(resources): State<Arc<ServerResources>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(policy) = &resources.ip_rate_limit else {
        return next.run(request).await;
    };

    let addr = client_addr(&request);
    let decision = match policy.check(addr).await {
        Ok(decision) => decision,
        Err(error) => return error.into_response(),
    };

    if let Err(error) = decision.into_result() {
        AppLogger::log_security_event(
            "rate_limited",
            "low",
            &format!("{} requests in window, limit {}", decision.count, decision.limit),
            Some(&addr.to_string()),
        );
        return error.into_response();
    }

    debug!(%addr, count = decision.count, "Request within address budget");
    next.run(request).await
}
