//! Decryption contract for tenant secrets. Key management lives outside this
//! crate; callers hand in whatever implementation holds the private keys.

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecryptError {
    #[error("illegal base64 data at input byte {0}")]
    Encoding(usize),
    #[error("unable to decrypt data with any of the private keys")]
    NoMatchingKey,
    #[error("{0}")]
    Other(String),
}

pub trait Decrypt: Send + Sync {
    fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>, DecryptError>;
}
