//! ela-wallet CLI Application
//!
//! A command-line wallet: key custody, accounts, balances and the
//! create, sign and send transaction pipeline.

use clap::{Parser, Subcommand};
use ela_wallet::cli::{self, CliResult, CreateOptions, Session};
use ela_wallet::network::RpcClient;
use ela_wallet::wallet::{FixedPassword, PasswordSource, TerminalPassword, WalletConfig};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "ela-wallet")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Command-line wallet with multi-signature accounts", long_about = None)]
struct Cli {
    /// Data directory for the keystore and address book
    #[arg(short, long, default_value = ".ela_wallet")]
    data_dir: PathBuf,

    /// JSON-RPC endpoint of the node, overrides config.toml
    #[arg(long)]
    rpc_url: Option<String>,

    /// Keystore password; prompted for when omitted
    #[arg(short, long, global = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new wallet
    Create,

    /// Show main account info
    Account,

    /// Change the keystore password
    ChangePassword {
        /// New password; prompted for when omitted
        #[arg(long)]
        new_password: Option<String>,
    },

    /// Add a standard account from a public key, or a multi-signature
    /// account from comma-separated public keys
    AddAccount {
        /// Hex public key, or k1,k2,k3,...
        keys: String,

        /// Signatures required by a multi-signature account
        #[arg(short, long)]
        required: Option<usize>,
    },

    /// List balances of every account
    Balance,

    /// Create, sign or send a transaction
    Transaction {
        #[command(subcommand)]
        action: TransactionCommands,
    },

    /// Reset the wallet data store
    Reset,
}

#[derive(Subcommand)]
enum TransactionCommands {
    /// Build an unsigned transaction
    Create {
        /// Spend addresses (comma-separated); defaults to every funded account
        #[arg(long)]
        from: Option<String>,

        /// Receiving address
        #[arg(long)]
        to: Option<String>,

        /// Amount to send
        #[arg(long)]
        amount: Option<String>,

        /// CSV file or inline rows of address,amount
        #[arg(long)]
        content: Option<String>,

        /// Transaction fee
        #[arg(long)]
        fee: String,

        /// Block height until which received outputs stay locked
        #[arg(long)]
        lock: Option<u32>,

        /// Write the transaction hex to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Add this wallet's signatures
    Sign {
        /// Transaction file or hex
        #[arg(long)]
        content: String,

        /// Write the transaction hex to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Broadcast a fully signed transaction
    Send {
        /// Transaction file or hex
        #[arg(long)]
        content: String,
    },
}

/// A failed command: what was attempted and the process exit code
#[derive(Debug)]
struct Failure {
    context: &'static str,
    code: i32,
    error: Box<dyn std::error::Error>,
}

fn check<T>(result: CliResult<T>, context: &'static str, code: i32) -> Result<T, Failure> {
    result.map_err(|error| Failure {
        context,
        code,
        error,
    })
}

fn password_source(password: Option<String>) -> Box<dyn PasswordSource> {
    match password {
        Some(p) => Box::new(FixedPassword::new(p)),
        None => Box::new(TerminalPassword),
    }
}

fn rpc_client(config: &WalletConfig) -> CliResult<RpcClient> {
    Ok(RpcClient::new(config.rpc.clone())?)
}

fn open(config: &WalletConfig, source: &dyn PasswordSource) -> Result<Session, Failure> {
    check(
        cli::open_session(config.clone(), source),
        "open wallet failed",
        2,
    )
}

/// Run one command. Sessions and password buffers are dropped, and so
/// wiped, before this returns.
fn run(args: Cli) -> Result<(), Failure> {
    let mut config = check(
        WalletConfig::load(&args.data_dir).map_err(Into::into),
        "load config failed",
        1,
    )?;
    if let Some(url) = args.rpc_url {
        config.rpc.url = url;
    }
    let source = password_source(args.password);

    match args.command {
        Commands::Create => check(
            cli::cmd_create(config, source.as_ref()),
            "create wallet failed",
            1,
        ),

        Commands::Account => {
            let session = open(&config, source.as_ref())?;
            check(cli::cmd_account(&session), "show account info failed", 3)
        }

        Commands::ChangePassword { new_password } => {
            let mut session = open(&config, source.as_ref())?;
            let new_source = password_source(new_password);
            check(
                cli::cmd_change_password(&mut session, new_source.as_ref()),
                "change password failed",
                4,
            )
        }

        Commands::AddAccount { keys, required } => {
            let mut session = open(&config, source.as_ref())?;
            let result = rpc_client(&config)
                .and_then(|client| cli::cmd_add_account(&mut session, &keys, required, &client));
            check(result, "add account failed", 5)
        }

        Commands::Balance => {
            let session = open(&config, source.as_ref())?;
            let result =
                rpc_client(&config).and_then(|client| cli::cmd_balance(&session, &client));
            check(result, "list balance info failed", 6)
        }

        Commands::Transaction { action } => match action {
            TransactionCommands::Create {
                from,
                to,
                amount,
                content,
                fee,
                lock,
                output,
            } => {
                let session = open(&config, source.as_ref())?;
                let options = CreateOptions {
                    from,
                    to,
                    amount,
                    content,
                    fee,
                    lock,
                };
                let result = rpc_client(&config).and_then(|client| {
                    cli::cmd_transaction_create(&session, &options, &client, output.as_deref())
                });
                check(result, "create transaction failed", 701)
            }
            TransactionCommands::Sign { content, output } => {
                let session = open(&config, source.as_ref())?;
                check(
                    cli::cmd_transaction_sign(&session, &content, output.as_deref()),
                    "sign transaction failed",
                    702,
                )
            }
            TransactionCommands::Send { content } => {
                let result = rpc_client(&config)
                    .and_then(|client| cli::cmd_transaction_send(&content, &client));
                check(result, "send transaction failed", 703)
            }
        },

        Commands::Reset => {
            let mut session = open(&config, source.as_ref())?;
            check(cli::cmd_reset(&mut session), "reset wallet data store failed", 8)
        }
    }
}

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(failure) = run(Cli::parse()) {
        eprintln!("❌ error: {}, {}", failure.context, failure.error);
        process::exit(failure.code);
    }
}
