//! Password handling
//!
//! Passwords travel as byte buffers owned by the caller. Every keystore
//! operation wraps the buffer in a [`PasswordGuard`] first, so the bytes
//! are zeroed on every exit path, errors included.

use super::WalletError;
use crate::crypto::wipe;
use zeroize::Zeroizing;

/// Borrowed password buffer that is wiped when the guard drops
pub struct PasswordGuard<'a> {
    bytes: &'a mut [u8],
}

impl<'a> PasswordGuard<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bytes
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Drop for PasswordGuard<'_> {
    fn drop(&mut self) {
        wipe(self.bytes);
    }
}

/// Where passwords come from
pub trait PasswordSource {
    /// Password for an existing keystore
    fn password(&self) -> Result<Zeroizing<Vec<u8>>, WalletError>;

    /// Password for a new keystore or a password change
    fn new_password(&self) -> Result<Zeroizing<Vec<u8>>, WalletError> {
        self.password()
    }
}

/// A password known up front (command-line flag, tests)
pub struct FixedPassword(Zeroizing<Vec<u8>>);

impl FixedPassword {
    pub fn new(password: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(password.into()))
    }
}

impl PasswordSource for FixedPassword {
    fn password(&self) -> Result<Zeroizing<Vec<u8>>, WalletError> {
        Ok(self.0.clone())
    }
}

/// Interactive prompt without echo
#[derive(Debug, Default)]
pub struct TerminalPassword;

impl TerminalPassword {
    fn prompt(text: &str) -> Result<Zeroizing<Vec<u8>>, WalletError> {
        let entered = Zeroizing::new(rpassword::prompt_password(text)?);
        Ok(Zeroizing::new(entered.as_bytes().to_vec()))
    }
}

impl PasswordSource for TerminalPassword {
    fn password(&self) -> Result<Zeroizing<Vec<u8>>, WalletError> {
        Self::prompt("Password: ")
    }

    fn new_password(&self) -> Result<Zeroizing<Vec<u8>>, WalletError> {
        let first = Self::prompt("New password: ")?;
        let second = Self::prompt("Confirm password: ")?;
        if first != second {
            return Err(WalletError::PasswordMismatch);
        }
        Ok(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_wipes_on_drop() {
        let mut buffer = b"Abc123!".to_vec();
        {
            let guard = PasswordGuard::new(&mut buffer);
            assert_eq!(guard.as_bytes(), b"Abc123!");
        }
        assert!(buffer.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_guard_wipes_on_early_return() {
        fn failing(password: &mut [u8]) -> Result<(), WalletError> {
            let _guard = PasswordGuard::new(password);
            Err(WalletError::WrongPassword)
        }

        let mut buffer = b"secret".to_vec();
        assert!(failing(&mut buffer).is_err());
        assert!(buffer.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_fixed_password_source() {
        let source = FixedPassword::new("pw");
        assert_eq!(source.password().unwrap().as_slice(), b"pw");
        assert_eq!(source.new_password().unwrap().as_slice(), b"pw");
    }
}
