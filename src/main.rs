use endpoint_client::cards::{cards_named, CardList};
use endpoint_client::{main_context, ClientConfig, Completion, EndpointClient};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("endpoint_client=info,cards=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Black Lotus".to_string());
    let config = ClientConfig::from_env();
    tracing::info!(base_url = %config.base_url, %name, "querying cards");

    let client = match EndpointClient::new(config) {
        Ok(client) => client,
        Err(err) => {
            tracing::error!(error = %err, "cannot create client");
            return ExitCode::FAILURE;
        }
    };

    let (dispatcher, main_loop) = main_context();
    let (done_tx, done_rx) = std::sync::mpsc::channel();
    client.spawn_typed(cards_named(&name), &dispatcher, move |completion: Completion<CardList>| {
        if let Some(response) = &completion.response {
            println!("status = {}\nheaders = {:?}", response.status, response.headers);
        }
        let ok = match completion.result {
            Ok(list) => {
                for card in &list.cards {
                    println!(
                        "{} [{}] {}",
                        card.name,
                        card.set.as_deref().unwrap_or("?"),
                        card.type_line.as_deref().unwrap_or("")
                    );
                }
                true
            }
            Err(err) => {
                eprintln!("request failed: {err}");
                false
            }
        };
        let _ = done_tx.send(ok);
    });
    drop(dispatcher);

    main_loop.run().await;
    match done_rx.try_recv() {
        Ok(true) => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}
