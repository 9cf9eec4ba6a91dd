use base64::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD, decode_config, encode_config};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use p256::{PublicKey, SecretKey};
use sha2::Sha256;

use aes_gcm::aead::Aead;
use aes_gcm::{Aes128Gcm, Key, KeyInit, Nonce};

#[derive(Debug, PartialEq, Eq)]
pub enum CryptoInputError {
    InvalidBase64,
    KeyLength { expected: usize, actual: usize },
    InvalidPublicKey,
    ExpandTooLong,
    Cipher,
}

impl std::fmt::Display for CryptoInputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CryptoInputError::InvalidBase64 => f.write_str("input is not valid base64"),
            CryptoInputError::KeyLength { expected, actual } => {
                write!(f, "unexpected key length {actual} (wanted {expected})")
            }
            CryptoInputError::InvalidPublicKey => f.write_str("invalid P-256 public key"),
            CryptoInputError::ExpandTooLong => f.write_str("requested hkdf output is too long"),
            CryptoInputError::Cipher => f.write_str("aes-gcm encryption failed"),
        }
    }
}

pub fn base64url_encode(bytes: impl AsRef<[u8]>) -> String {
    encode_config(bytes, URL_SAFE_NO_PAD)
}

pub fn base64url_decode(raw: &str) -> Result<Vec<u8>, CryptoInputError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CryptoInputError::InvalidBase64);
    }

    decode_config(trimmed, URL_SAFE_NO_PAD)
        .or_else(|_| decode_config(trimmed, URL_SAFE))
        .or_else(|_| decode_config(trimmed, STANDARD))
        .or_else(|_| decode_config(trimmed, STANDARD_NO_PAD))
        .map_err(|_| CryptoInputError::InvalidBase64)
}

pub fn derive_shared_secret(
    private_key: &SecretKey,
    public_key_bytes: &[u8],
) -> Result<[u8; 32], CryptoInputError> {
    let public_key = PublicKey::from_sec1_bytes(public_key_bytes)
        .map_err(|_| CryptoInputError::InvalidPublicKey)?;
    let shared =
        p256::ecdh::diffie_hellman(private_key.to_nonzero_scalar(), public_key.as_affine());
    Ok((*shared.raw_secret_bytes()).into())
}

pub fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; 32] {
    // qualified: aes_gcm::KeyInit offers a new_from_slice of its own
    let mut mac =
        <Hmac<Sha256> as Mac>::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(message);
    mac.finalize().into_bytes().into()
}

pub fn hkdf_extract(salt: &[u8], ikm: &[u8]) -> [u8; 32] {
    let (prk, _) = Hkdf::<Sha256>::extract(Some(salt), ikm);
    prk.into()
}

pub fn hkdf_expand(prk: &[u8], info: &[u8], length: usize) -> Result<Vec<u8>, CryptoInputError> {
    let hk = Hkdf::<Sha256>::from_prk(prk).map_err(|_| CryptoInputError::KeyLength {
        expected: 32,
        actual: prk.len(),
    })?;
    let mut okm = vec![0u8; length];
    hk.expand(info, &mut okm)
        .map_err(|_| CryptoInputError::ExpandTooLong)?;
    Ok(okm)
}

pub fn aes_gcm_encrypt(
    key: &[u8; 16],
    nonce: &[u8; 12],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoInputError> {
    let cipher = Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(key));
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|_| CryptoInputError::Cipher)
}
