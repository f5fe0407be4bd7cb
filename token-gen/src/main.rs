use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use shop_gateway::services::auth::{
    DEFAULT_ISSUER, KeyAlgorithm, KeyMaterial, TokenService, TokenSubject,
};

/// Mint, verify and inspect shop access tokens.
///
/// Uses the same TokenService as the gateway, so a token minted here is
/// exactly what the guards accept.
#[derive(Parser, Debug)]
#[command(name = "token-gen", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign a token with a private key.
    Sign(SignArgs),
    /// Verify a token with a public key and print its claims.
    Verify(VerifyArgs),
    /// Decode a token WITHOUT verifying it (diagnostics only).
    Inspect {
        token: String,
    },
}

#[derive(Args, Debug)]
struct KeyArgs {
    /// EdDSA, RS256 or ES256
    #[arg(long, default_value = "EdDSA")]
    algorithm: String,

    /// Expected / stamped issuer
    #[arg(long, default_value = DEFAULT_ISSUER)]
    issuer: String,
}

#[derive(Args, Debug)]
struct SignArgs {
    /// Path to the private key in PEM (PKCS#8)
    #[arg(long, value_name = "FILE")]
    private_pem: PathBuf,

    /// Path to the matching public key in PEM
    #[arg(long, value_name = "FILE")]
    public_pem: PathBuf,

    #[arg(long)]
    sub: String,

    #[arg(long)]
    email: String,

    #[arg(long, default_value = "CUSTOMER")]
    role: String,

    /// Lifetime in seconds; zero or negative yields an already expired token
    #[arg(long, default_value_t = 900, allow_hyphen_values = true)]
    ttl: i64,

    #[command(flatten)]
    key: KeyArgs,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    /// Path to the public key in PEM
    #[arg(long, value_name = "FILE")]
    public_pem: PathBuf,

    #[arg(long, default_value_t = 0)]
    leeway: u64,

    token: String,

    #[command(flatten)]
    key: KeyArgs,
}

fn read_pem(path: &PathBuf) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn algorithm(name: &str) -> Result<KeyAlgorithm> {
    name.parse()
        .map_err(|_| anyhow::anyhow!("unsupported algorithm: {name}"))
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Command::Sign(args) => {
            let public = read_pem(&args.public_pem)?;
            let private = read_pem(&args.private_pem)?;
            let keys = KeyMaterial::from_pem(algorithm(&args.key.algorithm)?, &public, Some(&private))?;

            let tokens = TokenService::new(keys, args.key.issuer, 0);
            let subject = TokenSubject::new(args.sub, args.email, args.role);
            println!("{}", tokens.sign(&subject, args.ttl)?);
        }
        Command::Verify(args) => {
            let public = read_pem(&args.public_pem)?;
            let keys = KeyMaterial::from_pem(algorithm(&args.key.algorithm)?, &public, None)?;

            let tokens = TokenService::new(keys, args.key.issuer, args.leeway);
            match tokens.verify(&args.token) {
                Ok(claims) => println!("{}", serde_json::to_string_pretty(&claims)?),
                Err(e) => anyhow::bail!("rejected ({}): {e}", e.kind()),
            }
        }
        Command::Inspect { token } => {
            let decoded = TokenService::decode_unsafe(&token)?;
            let out = serde_json::json!({
                "header": decoded.header,
                "claims": decoded.claims,
                "verified": false,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    Ok(())
}
