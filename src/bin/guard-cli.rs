use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};

use form_guard::auth::{hash_password, legacy_digest, validate_strength};
use form_guard::config::{AuthConfig, ValidationConfig};
use form_guard::pipeline::contact::{sanitize_contact, ContactSubmission};
use form_guard::security::{sanitize, FieldKind, InputValidator};

#[derive(Parser)]
#[command(name = "guard-cli")]
#[command(about = "Offline checks and remote status for the form guard", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Text,
    Name,
    Email,
}

impl From<Kind> for FieldKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Text => FieldKind::Text,
            Kind::Name => FieldKind::Name,
            Kind::Email => FieldKind::Email,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Sanitize a value the way the contact form does
    Sanitize {
        value: String,
        #[arg(short, long, value_enum, default_value = "text")]
        kind: Kind,
    },
    /// Sanitize and validate contact form fields with default bounds
    Validate {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        program: String,
        #[arg(long, default_value = "")]
        message: String,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Score a password
    Strength { password: String },
    /// Legacy SHA-256 digest for a `sha256:` credential row
    Digest {
        password: String,
        #[arg(long)]
        salt: Option<String>,
    },
    /// Argon2 hash for a credential row
    Hash { password: String },
    /// Check that a running guard is up
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sanitize { value, kind } => {
            println!("{}", sanitize(&value, kind.into()));
        }
        Commands::Validate {
            name,
            email,
            program,
            message,
            phone,
        } => {
            let clean = sanitize_contact(&ContactSubmission {
                name,
                email,
                program,
                message,
                phone,
                csrf_token: None,
            });
            let validator = InputValidator::new(ValidationConfig::default());
            let checks = [
                ("name", validator.is_valid_name(&clean.name)),
                ("email", validator.is_valid_email(&clean.email)),
                ("program", validator.is_valid_program(&clean.program)),
                ("message", validator.is_valid_message(&clean.message)),
                (
                    "phone",
                    clean.phone.as_deref().map_or(true, |p| validator.is_valid_phone(p)),
                ),
            ];
            let report: serde_json::Map<String, Value> = checks
                .iter()
                .map(|(field, ok)| (field.to_string(), json!(ok)))
                .collect();
            print_json(&json!({ "valid": checks.iter().all(|(_, ok)| *ok), "fields": report }))?;
        }
        Commands::Strength { password } => {
            let min_length = ValidationConfig::default().min_password_length;
            print_json(&json!(validate_strength(&password, min_length)))?;
        }
        Commands::Digest { password, salt } => {
            let salt = salt.unwrap_or_else(|| AuthConfig::default().legacy_salt);
            println!("sha256:{}", legacy_digest(&password, &salt));
        }
        Commands::Hash { password } => {
            let hash = hash_password(&password).map_err(|e| e.to_string())?;
            println!("{}", hash);
        }
        Commands::Status => {
            let client = reqwest::Client::new();
            let res = client.get(format!("{}/health", cli.url)).send().await?;
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            if status.is_success() {
                println!("{} {}", status, text.trim());
            } else {
                eprintln!("Error: guard returned status {}", status);
                eprintln!("Response: {}", text);
            }
        }
    }

    Ok(())
}

fn print_json(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
