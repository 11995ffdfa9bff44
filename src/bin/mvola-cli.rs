use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "mvola-cli")]
#[command(about = "Command-line client for a running MVola bridge", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check bridge liveness
    Health,
    /// Exchange consumer credentials for an access token
    Token {
        #[arg(long)]
        key: String,
        #[arg(long)]
        secret: String,
    },
    /// Submit a merchant payment and wait for its outcome
    Pay {
        #[arg(long)]
        token: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        client: String,
        #[arg(long)]
        partner: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        reference: String,
        #[arg(long, default_value = "Payment")]
        description: String,
        /// Reuse a specific correlation id instead of a generated one
        #[arg(long)]
        correlation_id: Option<String>,
        #[arg(long)]
        callback_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Health => client.get(format!("{}/health", base)).send().await?,
        Commands::Token { key, secret } => {
            client
                .post(format!("{}/mvola/token", base))
                .basic_auth(key, Some(secret))
                .send()
                .await?
        }
        Commands::Pay {
            token,
            amount,
            client: client_msisdn,
            partner,
            name,
            reference,
            description,
            correlation_id,
            callback_url,
        } => {
            let mut body = json!({
                "amount": amount,
                "clientMsisdn": client_msisdn,
                "partnerMsisdn": partner,
                "descriptionTransaction": description,
                "referenceID": reference,
                "name": name,
            });
            if let Some(id) = correlation_id {
                body["xCorrelationID"] = json!(id);
            }
            if let Some(url) = callback_url {
                body["callbackUrl"] = json!(url);
            }
            client
                .post(format!("{}/mvola/transaction", base))
                .bearer_auth(token)
                .json(&body)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: bridge returned status {}", status);
    } else if status.as_u16() == 202 {
        eprintln!("Accepted: no definitive status yet");
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
