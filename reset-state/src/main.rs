//! Event Reset Lambda - Handles POST requests carrying the daily reset code.
//!
//! A request whose `code` matches today's code triggers a signed call to the
//! private API's `/api/reset_initial_state` endpoint for the configured event.

use chrono::NaiveDate;
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::{handle_reset, today_local, Config, PrivateApiClient, ResetClient};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across requests.
struct AppState<C> {
    config: Config,
    private_api: C,
}

impl AppState<PrivateApiClient> {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let credentials = config.credentials.provider().await?;

        info!(
            hostname = %config.private_api_hostname,
            event_id = %config.event_id,
            "Loaded reset configuration"
        );

        Ok(Self {
            private_api: PrivateApiClient::new(reqwest::Client::new(), credentials, &config),
            config,
        })
    }
}

async fn respond<C: ResetClient>(
    state: &AppState<C>,
    event: Request,
    today: NaiveDate,
) -> Result<Response<Body>, Error> {
    let decision = handle_reset(
        &state.config,
        &state.private_api,
        today,
        event.body().as_ref(),
    )
    .await;

    info!(status = decision.status_code(), decision = ?decision, "Reset request handled");

    decision.into_response()
}

async fn handler<C: ResetClient>(
    state: Arc<AppState<C>>,
    event: Request,
) -> Result<Response<Body>, Error> {
    respond(&state, event, today_local()).await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
