#[path = "poetry-duet/app.rs"]
mod app;
#[path = "poetry-duet/args.rs"]
mod args;
#[path = "poetry-duet/logging.rs"]
mod logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run().await
}
