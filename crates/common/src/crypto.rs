//! Key material for actors.
//!
//! Every local actor owns an RSA key pair used to sign outbound federation
//! activities. Keys are stored as PEM text on the actor row.

use rsa::{
    RsaPrivateKey, RsaPublicKey,
    pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding},
};

use crate::{AppError, AppResult};

/// RSA key pair in PEM format.
#[derive(Debug, Clone)]
pub struct RsaKeypair {
    /// Public key in PEM format (SPKI encoding).
    pub public_key_pem: String,
    /// Private key in PEM format (PKCS#8 encoding).
    pub private_key_pem: String,
}

const RSA_KEY_SIZE: usize = 2048;

/// Generate a new 2048-bit RSA key pair.
///
/// # Errors
///
/// Returns [`AppError::Internal`] if key generation or PEM encoding fails.
pub fn generate_rsa_keypair() -> AppResult<RsaKeypair> {
    let mut rng = rand::thread_rng();

    let private_key = RsaPrivateKey::new(&mut rng, RSA_KEY_SIZE)
        .map_err(|e| AppError::Internal(format!("Failed to generate RSA key: {e}")))?;

    let public_key = RsaPublicKey::from(&private_key);

    let private_key_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| AppError::Internal(format!("Failed to encode private key: {e}")))?
        .to_string();

    let public_key_pem = public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| AppError::Internal(format!("Failed to encode public key: {e}")))?;

    Ok(RsaKeypair {
        public_key_pem,
        private_key_pem,
    })
}
