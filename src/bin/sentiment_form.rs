//! Terminal front-end for the sentiment API.

use clap::Parser;
use sentiment_api::form::{FormState, HttpPredictClient, DEFAULT_API_URL};
use sentiment_api::init_tracing;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "sentiment-form", about = "Text Sentiment Analyzer")]
struct Args {
    /// Prediction endpoint
    #[arg(long, env = "SENTIMENT_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Analyze this text once and exit
    #[arg(long)]
    text: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("sentiment_api=warn");
    let args = Args::parse();
    let client = HttpPredictClient::new(args.api_url);
    let mut form = FormState::new();

    if let Some(text) = args.text {
        form.set_text(text);
        form.submit(&client).await;
        println!("{}", form.render());
        if form.error().is_some() {
            std::process::exit(1);
        }
        return Ok(());
    }

    println!("Text Sentiment Analyzer");
    println!("Enter text for sentiment analysis. A blank line submits, Ctrl-D quits.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut buffer: Vec<String> = Vec::new();
    loop {
        let line = lines.next_line().await?;
        let at_eof = line.is_none();
        match line {
            Some(line) if !line.trim().is_empty() => {
                buffer.push(line);
                continue;
            }
            _ => {}
        }

        if !(at_eof && buffer.is_empty()) {
            form.set_text(buffer.join("\n"));
            buffer.clear();
            form.submit(&client).await;
            println!("{}\n", form.render());
        }
        if at_eof {
            return Ok(());
        }
    }
}
