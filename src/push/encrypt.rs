use p256::SecretKey;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::{CryptoRng, RngCore};

use crate::crypto::{self, CryptoInputError};
use crate::types::push::SubscriptionKeys;

const AUTH_SECRET_LENGTH: usize = 16;
const PUBLIC_KEY_LENGTH: usize = 65;
const SALT_LENGTH: usize = 16;
const CEK_LENGTH: usize = 16;
const NONCE_LENGTH: usize = 12;

#[derive(Debug)]
pub(crate) struct EncryptedMessage {
    pub(crate) ciphertext: Vec<u8>,
    pub(crate) salt: [u8; SALT_LENGTH],
    pub(crate) server_public_key: [u8; PUBLIC_KEY_LENGTH],
}

pub(crate) fn encrypt_message_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
    keys: &SubscriptionKeys,
    plaintext: &[u8],
) -> Result<EncryptedMessage, CryptoInputError> {
    let auth_secret = crypto::base64url_decode(&keys.auth)?;
    if auth_secret.len() != AUTH_SECRET_LENGTH {
        return Err(CryptoInputError::KeyLength {
            expected: AUTH_SECRET_LENGTH,
            actual: auth_secret.len(),
        });
    }
    let client_public = crypto::base64url_decode(&keys.p256dh)?;
    if client_public.len() != PUBLIC_KEY_LENGTH {
        return Err(CryptoInputError::KeyLength {
            expected: PUBLIC_KEY_LENGTH,
            actual: client_public.len(),
        });
    }

    // fresh ephemeral key for every message, used for exactly one exchange
    let ephemeral = SecretKey::random(rng);
    let server_public: [u8; PUBLIC_KEY_LENGTH] = ephemeral
        .public_key()
        .to_encoded_point(false)
        .as_bytes()
        .try_into()
        .map_err(|_| CryptoInputError::InvalidPublicKey)?;

    let shared_secret = crypto::derive_shared_secret(&ephemeral, &client_public)?;
    let auth_prk = crypto::hkdf_extract(&auth_secret, &shared_secret);

    let mut salt = [0u8; SALT_LENGTH];
    rng.fill_bytes(&mut salt);
    let content_prk = crypto::hkdf_extract(&salt, &auth_prk);

    let cek_info =
        key_derivation_info(b"Content-Encoding: aes128gcm", &client_public, &server_public);
    let nonce_info = key_derivation_info(b"Content-Encoding: nonce", &client_public, &server_public);
    let cek: [u8; CEK_LENGTH] = crypto::hkdf_expand(&content_prk, &cek_info, CEK_LENGTH)?
        .try_into()
        .map_err(|_| CryptoInputError::Cipher)?;
    let nonce: [u8; NONCE_LENGTH] = crypto::hkdf_expand(&content_prk, &nonce_info, NONCE_LENGTH)?
        .try_into()
        .map_err(|_| CryptoInputError::Cipher)?;

    // single record: one zero delimiter octet ahead of the payload
    let mut padded = Vec::with_capacity(plaintext.len() + 1);
    padded.push(0u8);
    padded.extend_from_slice(plaintext);

    let ciphertext = crypto::aes_gcm_encrypt(&cek, &nonce, &padded)?;

    Ok(EncryptedMessage {
        ciphertext,
        salt,
        server_public_key: server_public,
    })
}

fn key_derivation_info(label: &[u8], client_public: &[u8], server_public: &[u8]) -> Vec<u8> {
    let mut info = Vec::with_capacity(label.len() + 12 + client_public.len() + server_public.len());
    info.extend_from_slice(label);
    info.push(0);
    info.extend_from_slice(b"P-256");
    info.push(0);
    info.extend_from_slice(&(client_public.len() as u16).to_be_bytes());
    info.extend_from_slice(client_public);
    info.extend_from_slice(&(server_public.len() as u16).to_be_bytes());
    info.extend_from_slice(server_public);
    info
}
