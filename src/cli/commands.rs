//! CLI commands for the wallet
//!
//! Implements all command handlers for the CLI interface.

use crate::core::{Amount, Transaction};
use crate::network::{Broadcaster, ChainSource};
use crate::wallet::{
    parse_output_content, send_raw_transaction, OutputSpec, PasswordSource, Wallet,
    WalletConfig, WalletHandle,
};
use std::fs;
use std::path::Path;
use zeroize::Zeroizing;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// An open wallet plus the password it was opened with
pub struct Session {
    pub wallet: WalletHandle,
    password: Zeroizing<Vec<u8>>,
}

impl Session {
    /// Fresh copy of the password for an operation that wipes it
    fn password(&self) -> Zeroizing<Vec<u8>> {
        self.password.clone()
    }
}

/// Open the wallet in `config`, asking `source` for the password
pub fn open_session(config: WalletConfig, source: &dyn PasswordSource) -> CliResult<Session> {
    let password = source.password()?;
    let mut buffer = password.clone();
    let wallet = Wallet::open(config, &mut buffer)?;
    Ok(Session { wallet, password })
}

/// Inline text, or the contents of the file it names
pub fn read_content(content: &str) -> CliResult<String> {
    let path = Path::new(content);
    if path.is_file() {
        Ok(fs::read_to_string(path)?)
    } else {
        Ok(content.to_string())
    }
}

fn print_line() {
    println!("{}", "=".repeat(80));
}

fn write_transaction(tx: &Transaction, output: Option<&Path>) -> CliResult<()> {
    let hex_text = tx.to_hex();
    match output {
        Some(path) => {
            fs::write(path, format!("{}\n", hex_text))?;
            println!("   💾 Saved to {:?}", path);
        }
        None => {
            println!("{}", hex_text);
        }
    }
    Ok(())
}

fn print_signature_status(tx: &Transaction) {
    for (program_hash, have, need) in tx.signature_status() {
        println!("   ├─ {}: {}/{} signatures", program_hash, have, need);
    }
    if tx.is_complete() {
        println!("   └─ ✅ Ready to send");
    } else {
        println!("   └─ ⏳ Waiting for more signatures");
    }
}

/// Create a new wallet and show its main account
pub fn cmd_create(config: WalletConfig, source: &dyn PasswordSource) -> CliResult<()> {
    if Wallet::exists(&config) {
        return Err(format!("wallet already exists in {:?}", config.data_dir).into());
    }

    let password = source.new_password()?;
    let mut buffer = password.clone();
    let wallet = Wallet::create(config, &mut buffer)?;

    println!("🔐 New wallet created!");
    let session = Session { wallet, password };
    cmd_account(&session)?;

    println!("\n   ⚠️  IMPORTANT: Your encrypted key is stored in the data directory.");
    println!("   Back up this directory to avoid losing access to your funds!");
    Ok(())
}

/// Show main account info
pub fn cmd_account(session: &Session) -> CliResult<()> {
    let mut password = session.password();
    let info = session.wallet.account_info(&mut password)?;

    print_line();
    println!("Address:      {}", info.address);
    println!("Public Key:   {}", info.public_key);
    println!("ProgramHash:  {}", info.program_hash);
    print_line();
    Ok(())
}

/// Change the keystore password
pub fn cmd_change_password(session: &mut Session, new_source: &dyn PasswordSource) -> CliResult<()> {
    println!("# input new password #");
    let new_password = new_source.new_password()?;

    let mut old = session.password();
    let mut new = new_password.clone();
    session.wallet.change_password(&mut old, &mut new)?;
    session.password = new_password;

    println!("✅ Password changed successfully");
    Ok(())
}

/// Add a standard or multi-signature account
pub fn cmd_add_account(
    session: &mut Session,
    keys: &str,
    required: Option<usize>,
    source: &dyn ChainSource,
) -> CliResult<()> {
    let program_hash = session.wallet.add_account(keys, required, source)?;
    let kind = if program_hash.is_multisig() {
        "multi-signature"
    } else {
        "standard"
    };

    println!("➕ Added {} account", kind);
    println!("   📍 Address: {}", program_hash.to_address());
    Ok(())
}

/// List balances of every account
pub fn cmd_balance(session: &Session, source: &dyn ChainSource) -> CliResult<()> {
    let entries = session.wallet.list_balances(source)?;

    print_line();
    for entry in entries {
        println!("Address:      {}", entry.address);
        println!("ProgramHash:  {}", entry.program_hash);
        println!("Type:         {}", entry.kind);
        println!("Balance:      {}", entry.balance);
        if !entry.locked.is_zero() {
            println!("Locked:       {}", entry.locked);
        }
        print_line();
    }
    println!("Height:       {}", session.wallet.ledger().height());
    Ok(())
}

/// Options for `transaction create`
#[derive(Debug, Default)]
pub struct CreateOptions {
    pub from: Option<String>,
    pub to: Option<String>,
    pub amount: Option<String>,
    pub content: Option<String>,
    pub fee: String,
    pub lock: Option<u32>,
}

impl CreateOptions {
    fn outputs(&self) -> CliResult<Vec<OutputSpec>> {
        match (&self.content, &self.to, &self.amount) {
            (Some(content), None, None) => Ok(parse_output_content(&read_content(content)?)?),
            (None, Some(to), Some(amount)) => {
                let amount: Amount = amount.parse()?;
                Ok(vec![OutputSpec::new(to.as_str(), amount)])
            }
            _ => Err("use either --to with --amount, or --content".into()),
        }
    }

    fn from_addresses(&self) -> Vec<String> {
        self.from
            .as_deref()
            .map(|list| {
                list.split(',')
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Build an unsigned transaction
pub fn cmd_transaction_create(
    session: &Session,
    options: &CreateOptions,
    source: &dyn ChainSource,
    output: Option<&Path>,
) -> CliResult<()> {
    let outputs = options.outputs()?;
    let fee: Amount = options.fee.parse()?;

    let tx = session.wallet.create_transaction(
        source,
        &options.from_addresses(),
        &outputs,
        fee,
        options.lock,
    )?;

    println!("📤 Transaction created:");
    println!("   ID: {}", tx.tx_id());
    println!("   Inputs: {}", tx.inputs.len());
    println!("   Outputs: {}", tx.outputs.len());
    println!("   Fee: {}", tx.fee()?);
    if tx.lock_time > 0 {
        println!("   Lock time: {}", tx.lock_time);
    }
    write_transaction(&tx, output)
}

/// Add this wallet's signatures to a transaction
pub fn cmd_transaction_sign(session: &Session, content: &str, output: Option<&Path>) -> CliResult<()> {
    let tx = Transaction::from_hex(read_content(content)?.trim())?;
    let mut password = session.password();
    let tx = session.wallet.sign_transaction(tx, &mut password)?;

    println!("✍️  Transaction signed:");
    println!("   ID: {}", tx.tx_id());
    print_signature_status(&tx);
    write_transaction(&tx, output)
}

/// Broadcast a fully signed transaction
pub fn cmd_transaction_send(content: &str, broadcaster: &dyn Broadcaster) -> CliResult<()> {
    let tx_id = send_raw_transaction(read_content(content)?.trim(), broadcaster)?;

    println!("✅ Transaction sent");
    println!("   ID: {}", tx_id);
    Ok(())
}

/// Drop added accounts and cached outputs
pub fn cmd_reset(session: &mut Session) -> CliResult<()> {
    session.wallet.reset()?;
    println!("🧹 Wallet data store was reset successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_content_file_or_inline() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("outputs.csv");
        fs::write(&path, "Eaddr,1\n").unwrap();

        assert_eq!(read_content(path.to_str().unwrap()).unwrap(), "Eaddr,1\n");
        assert_eq!(read_content("Eaddr,2").unwrap(), "Eaddr,2");
    }

    #[test]
    fn test_create_options_outputs() {
        let options = CreateOptions {
            to: Some("Eaddr".to_string()),
            amount: Some("1.25".to_string()),
            fee: "0.01".to_string(),
            ..Default::default()
        };
        let outputs = options.outputs().unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].amount, "1.25".parse().unwrap());

        let both = CreateOptions {
            to: Some("Eaddr".to_string()),
            content: Some("Eaddr,1".to_string()),
            ..Default::default()
        };
        assert!(both.outputs().is_err());

        let from = CreateOptions {
            from: Some("Ea, Eb,".to_string()),
            ..Default::default()
        };
        assert_eq!(from.from_addresses(), vec!["Ea", "Eb"]);
    }
}
