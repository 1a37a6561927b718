//! LNURL challenge material: token generation, the challenge digest, and the
//! bech32 `lnurl` encoding of wallet-facing URLs.

use bech32::{Bech32, Hrp};
use rand::RngCore;
use sha2::{Digest, Sha256};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum LnurlError {
    #[error("invalid hex token: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("bech32 encoding failed: {0}")]
    Bech32(#[from] bech32::EncodeError),
    #[error("invalid human-readable part: {0}")]
    Hrp(#[from] bech32::primitives::hrp::Error),
    #[error("invalid callback URL: {0}")]
    Url(#[from] url::ParseError),
}

/// A fresh 32-byte challenge token as lowercase hex. Used both for auth `k1`
/// values and withdraw secrets.
pub fn generate_k1() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 over the raw bytes behind a hex token, returned as lowercase hex.
///
/// Wallet responses present this digest rather than the token itself;
/// resolution recomputes it for every stored pending `k1`.
pub fn challenge_digest(k1_hex: &str) -> Result<String, LnurlError> {
    let bytes = hex::decode(k1_hex)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// The wallet-facing callback URL for an auth challenge.
pub fn auth_challenge_url(public_url: &Url, k1: &str) -> Result<Url, LnurlError> {
    let mut url = public_url.join("lnurl-auth/callback")?;
    url.query_pairs_mut()
        .append_pair("tag", "login")
        .append_pair("k1", k1);
    Ok(url)
}

/// Bech32-encode a URL under the `lnurl` human-readable part.
pub fn encode_lnurl(url: &Url) -> Result<String, LnurlError> {
    let hrp = Hrp::parse("lnurl")?;
    Ok(bech32::encode::<Bech32>(hrp, url.as_str().as_bytes())?)
}
