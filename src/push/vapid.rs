use jwt_simple::algorithms::ECDSAP256KeyPairLike;
use jwt_simple::prelude::{Claims, Duration as JwtDuration, ES256KeyPair, UnixTimeStamp};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use time::OffsetDateTime;

use crate::config;
use crate::crypto;
use crate::types::push::VapidConfig;

const TOKEN_TTL_HOURS: u64 = 12;

#[derive(Debug, Clone)]
pub struct VapidCredentials {
    pub private_key: String,
    pub public_key: String,
}

#[derive(Debug, Clone)]
pub(crate) enum VapidConfigStatus {
    Missing,
    Incomplete,
    Ready(VapidConfig),
}

#[derive(Debug)]
pub enum VapidError {
    InvalidPrivateKey,
    InvalidPublicKey,
    PublicKeyMismatch,
    Signing,
}

impl std::fmt::Display for VapidError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VapidError::InvalidPrivateKey => {
                f.write_str("vapid private key is not pem, base64 der, or a raw scalar")
            }
            VapidError::InvalidPublicKey => f.write_str("vapid public key does not decode"),
            VapidError::PublicKeyMismatch => {
                f.write_str("vapid public key does not match the private key")
            }
            VapidError::Signing => f.write_str("failed to sign vapid token"),
        }
    }
}

pub(crate) fn load_vapid_config(config: &config::AppConfig) -> VapidConfigStatus {
    let private_key = config.vapid_private_key.as_ref();
    let public_key = config.vapid_public_key.as_ref();
    let subject = config.vapid_subject.as_ref();
    let has_any = private_key.is_some() || public_key.is_some() || subject.is_some();

    match (private_key, public_key, subject) {
        (Some(private_key), Some(public_key), Some(subject)) => {
            VapidConfigStatus::Ready(VapidConfig {
                private_key: private_key.clone(),
                public_key: public_key.clone(),
                subject: subject.clone(),
            })
        }
        _ if has_any => VapidConfigStatus::Incomplete,
        _ => VapidConfigStatus::Missing,
    }
}

// Private keys arrive in the wild in several encodings; try the strict ones
// first and keep the raw-scalar form last since any 32-byte blob passes it.
pub(crate) fn resolve_signing_key(config: &VapidConfig) -> Result<ES256KeyPair, VapidError> {
    if let Some(key_pair) = key_pair_from_pem(&config.private_key) {
        return Ok(key_pair);
    }
    if let Some(key_pair) = key_pair_from_der(&config.private_key) {
        return Ok(key_pair);
    }
    key_pair_from_raw_scalar(&config.private_key, &config.public_key)
}

fn key_pair_from_pem(raw: &str) -> Option<ES256KeyPair> {
    let trimmed = raw.trim();
    if !trimmed.contains("-----BEGIN") {
        return None;
    }
    ES256KeyPair::from_pem(trimmed).ok()
}

fn key_pair_from_der(raw: &str) -> Option<ES256KeyPair> {
    let der = crypto::base64url_decode(raw).ok()?;
    ES256KeyPair::from_der(&der).ok()
}

fn key_pair_from_raw_scalar(raw: &str, public_key: &str) -> Result<ES256KeyPair, VapidError> {
    let scalar = crypto::base64url_decode(raw).map_err(|_| VapidError::InvalidPrivateKey)?;
    if scalar.len() != 32 {
        return Err(VapidError::InvalidPrivateKey);
    }
    let key_pair = ES256KeyPair::from_bytes(&scalar).map_err(|_| VapidError::InvalidPrivateKey)?;

    let expected = uncompressed_public_key(public_key)?;
    let derived = key_pair_public_point(&key_pair)?;
    if derived.as_slice() != expected.as_slice() {
        return Err(VapidError::PublicKeyMismatch);
    }
    Ok(key_pair)
}

// jwt-simple only hands out the compressed SEC1 encoding; VAPID transports
// the 65-byte uncompressed point, so re-encode through p256.
fn key_pair_public_point(key_pair: &ES256KeyPair) -> Result<[u8; 65], VapidError> {
    let point = p256::PublicKey::from_sec1_bytes(&key_pair.public_key().to_bytes())
        .map_err(|_| VapidError::InvalidPublicKey)?;
    point
        .to_encoded_point(false)
        .as_bytes()
        .try_into()
        .map_err(|_| VapidError::InvalidPublicKey)
}

fn uncompressed_public_key(raw: &str) -> Result<Vec<u8>, VapidError> {
    let decoded = crypto::base64url_decode(raw).map_err(|_| VapidError::InvalidPublicKey)?;
    match decoded.len() {
        65 if decoded[0] == 0x04 => Ok(decoded),
        64 => {
            let mut point = Vec::with_capacity(65);
            point.push(0x04);
            point.extend_from_slice(&decoded);
            Ok(point)
        }
        _ => Err(VapidError::InvalidPublicKey),
    }
}

pub(crate) fn sign_vapid_token(
    key_pair: &ES256KeyPair,
    audience: &str,
    subject: &str,
    now: OffsetDateTime,
) -> Result<String, VapidError> {
    let issued_at = UnixTimeStamp::from_secs(now.unix_timestamp().max(0) as u64);
    let mut claims = Claims::create(JwtDuration::from_hours(TOKEN_TTL_HOURS))
        .with_audience(audience)
        .with_subject(subject);
    // Claims::create stamps all three from the wall clock; every time claim
    // must come from the injected `now` instead.
    claims.issued_at = Some(issued_at);
    claims.invalid_before = Some(issued_at);
    claims.expires_at = Some(issued_at + JwtDuration::from_hours(TOKEN_TTL_HOURS));
    key_pair.sign(claims).map_err(|_| VapidError::Signing)
}

pub fn generate_vapid_credentials() -> VapidCredentials {
    let mut rng = OsRng;
    generate_vapid_credentials_with_rng(&mut rng)
}

pub fn generate_vapid_credentials_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
) -> VapidCredentials {
    let mut key_bytes = [0u8; 32];
    loop {
        rng.fill_bytes(&mut key_bytes);
        let Ok(key_pair) = ES256KeyPair::from_bytes(&key_bytes) else {
            continue;
        };
        let Ok(public_point) = key_pair_public_point(&key_pair) else {
            continue;
        };
        return VapidCredentials {
            private_key: crypto::base64url_encode(key_pair.to_bytes()),
            public_key: crypto::base64url_encode(public_point),
        };
    }
}
