use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use jwt_simple::prelude::ES256KeyPair;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use reqwest::header::{AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE};
use time::OffsetDateTime;

use crate::crypto::{self, CryptoInputError};
use crate::ports;
use crate::push::encrypt;
use crate::push::vapid::{self, VapidError};
use crate::types::push::{PushSubscription, VapidConfig};

const PUSH_TTL_SECONDS: &str = "86400";

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimeProvider;

impl ports::TimeProvider for TokioTimeProvider {
    type Sleep<'a>
        = tokio::time::Sleep
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
        tokio::time::sleep(duration)
    }
}

#[derive(Debug)]
pub enum SendPushError {
    InvalidEndpoint,
    Vapid(VapidError),
    Crypto(CryptoInputError),
    Request(reqwest::Error),
    Rejected(u16),
}

impl std::fmt::Display for SendPushError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendPushError::InvalidEndpoint => {
                f.write_str("subscription endpoint is not a valid url")
            }
            SendPushError::Vapid(err) => write!(f, "vapid: {err}"),
            SendPushError::Crypto(err) => write!(f, "encryption: {err}"),
            SendPushError::Request(err) => write!(f, "request failed: {err}"),
            SendPushError::Rejected(status) => {
                write!(f, "push service responded with status {status}")
            }
        }
    }
}

#[derive(Clone)]
pub struct WebPushSender {
    vapid: VapidConfig,
    key_pair: Arc<ES256KeyPair>,
    client: reqwest::Client,
}

pub(crate) struct PreparedPush {
    pub(crate) endpoint: reqwest::Url,
    pub(crate) authorization: String,
    pub(crate) encryption: String,
    pub(crate) crypto_key: String,
    pub(crate) body: Vec<u8>,
}

impl WebPushSender {
    pub fn new(vapid: VapidConfig) -> Result<Self, SendPushError> {
        let key_pair = vapid::resolve_signing_key(&vapid).map_err(SendPushError::Vapid)?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(SendPushError::Request)?;
        Ok(Self {
            vapid,
            key_pair: Arc::new(key_pair),
            client,
        })
    }

    // Tokens are minted per dispatch; the audience differs per push service.
    pub(crate) fn prepare_push<R: RngCore + CryptoRng>(
        &self,
        subscription: &PushSubscription,
        payload: &str,
        now: OffsetDateTime,
        rng: &mut R,
    ) -> Result<PreparedPush, SendPushError> {
        let endpoint = reqwest::Url::parse(&subscription.endpoint)
            .map_err(|_| SendPushError::InvalidEndpoint)?;
        let audience = push_audience(&endpoint)?;
        let token = vapid::sign_vapid_token(&self.key_pair, &audience, &self.vapid.subject, now)
            .map_err(SendPushError::Vapid)?;
        let message = encrypt::encrypt_message_with_rng(rng, &subscription.keys, payload.as_bytes())
            .map_err(SendPushError::Crypto)?;

        Ok(PreparedPush {
            endpoint,
            authorization: format!("vapid t={token}, k={}", self.vapid.public_key),
            encryption: format!("salt={}", crypto::base64url_encode(message.salt)),
            crypto_key: format!(
                "dh={}; p256ecdsa={}",
                crypto::base64url_encode(message.server_public_key),
                self.vapid.public_key
            ),
            body: message.ciphertext,
        })
    }

    async fn execute(&self, prepared: PreparedPush) -> Result<(), SendPushError> {
        let response = self
            .client
            .post(prepared.endpoint)
            .header("TTL", PUSH_TTL_SECONDS)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_ENCODING, "aes128gcm")
            .header(AUTHORIZATION, prepared.authorization)
            .header("Encryption", prepared.encryption)
            .header("Crypto-Key", prepared.crypto_key)
            .body(prepared.body)
            .send()
            .await
            .map_err(SendPushError::Request)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SendPushError::Rejected(status.as_u16()))
        }
    }
}

fn push_audience(endpoint: &reqwest::Url) -> Result<String, SendPushError> {
    let host = endpoint.host_str().ok_or(SendPushError::InvalidEndpoint)?;
    Ok(match endpoint.port() {
        Some(port) => format!("{}://{}:{}", endpoint.scheme(), host, port),
        None => format!("{}://{}", endpoint.scheme(), host),
    })
}

impl ports::PushSender for WebPushSender {
    type Error = SendPushError;
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<(), Self::Error>> + Send + 'a>>
    where
        Self: 'a;

    fn send<'a>(&'a self, subscription: &'a PushSubscription, payload: &'a str) -> Self::Fut<'a> {
        Box::pin(async move {
            let prepared =
                self.prepare_push(subscription, payload, OffsetDateTime::now_utc(), &mut OsRng)?;
            self.execute(prepared).await
        })
    }
}
