use crate::{
    api::types::{CreateWashResponse, OkResponse},
    cli::commands::client::Request,
    client::ApiClient,
};
use anyhow::Result;
use serde::Serialize;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub api_url: String,
    pub request: Request,
}

/// Execute a single API call and print the response as JSON.
/// # Errors
/// Returns an error if the API is unreachable or answers with an error.
pub async fn execute(args: Args) -> Result<()> {
    let client = ApiClient::new(&args.api_url)?;
    debug!("API: {}", client.base_url());

    match args.request {
        Request::Add(request) => {
            let id = client.create_wash(&request).await?;
            print_json(&CreateWashResponse { ok: true, id })
        }
        Request::Pay { id } => print_json(&client.mark_paid(&id).await?),
        Request::Email {
            id,
            to,
            business_name,
        } => {
            client
                .send_receipt_email(&id, &to, business_name.as_deref())
                .await?;
            print_json(&OkResponse { ok: true })
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
