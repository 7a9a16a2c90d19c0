use sentiment_api::{config::Config, init_tracing, server};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("sentiment_api=info,actix_web=info");

    let config = Config::load()?;
    server::run(config).await
}
