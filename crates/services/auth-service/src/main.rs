//! Auth Service - HTTP server for authentication.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use domain::{
    hash_password_with_cost, is_common_password, password_strength, validate_password,
    HashingCost, PasswordRequirements,
};

#[derive(Parser)]
#[command(name = "auth-service")]
#[command(about = "Authentication service for the route manager")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        #[arg(long, env = "AUTH_SERVICE_HOST", default_value = "0.0.0.0")]
        host: String,
        #[arg(long, env = "AUTH_SERVICE_PORT", default_value = "8080")]
        port: u16,
    },
    /// Check a password against the policy and print its Argon2 digest
    HashPassword {
        password: String,
        /// Argon2 time cost
        #[arg(long, env = "PASSWORD_HASH_ITERATIONS")]
        iterations: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port } => {
            auth_service_lib::run_embedded(&host, port).await?;
        }
        Commands::HashPassword {
            password,
            iterations,
        } => {
            let mut cost = HashingCost::default();
            if let Some(iterations) = iterations {
                cost.iterations = iterations;
            }

            match validate_password(&password, &PasswordRequirements::standard()) {
                Ok(()) => println!("policy:   ok"),
                Err(e) => println!("policy:   {}", e),
            }
            println!("strength: {}", password_strength(&password));
            if is_common_password(&password) {
                println!("warning:  password is on the common-password list");
            }
            println!("{}", hash_password_with_cost(&password, &cost)?);
        }
    }

    Ok(())
}
