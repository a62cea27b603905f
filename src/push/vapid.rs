use base64::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD, decode_config, encode_config};
use jwt_simple::prelude::{ECDSAP256KeyPairLike, ES256KeyPair};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

/// Application server key used when none is configured.
pub const DEFAULT_APPLICATION_SERVER_KEY: &str =
    "BEl62iUYgUivxIkv69yViEuiBIa40HI80NM9LdNiVfQUjSrFzIvjSITfXBHRVxuSLr1oCNgVRqhHBD0CKs8Uw8s";

const UNCOMPRESSED_POINT_LEN: usize = 65;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("application server key is empty")]
    Empty,
    #[error("application server key is not valid base64")]
    Encoding,
    #[error("application server key must be a 65-byte uncompressed P-256 point, got {0} bytes")]
    InvalidPoint(usize),
}

/// Decodes a base64url application server key into the raw point handed to
/// the push service. Padding and the standard alphabet are tolerated.
pub fn decode_application_server_key(raw: &str) -> Result<Vec<u8>, KeyError> {
    let trimmed = raw.trim().trim_end_matches('=');
    if trimmed.is_empty() {
        return Err(KeyError::Empty);
    }

    let bytes = decode_config(trimmed, URL_SAFE_NO_PAD)
        .or_else(|_| decode_config(pad(trimmed), URL_SAFE))
        .or_else(|_| decode_config(pad(trimmed), STANDARD))
        .map_err(|_| KeyError::Encoding)?;

    if bytes.len() != UNCOMPRESSED_POINT_LEN || bytes[0] != 0x04 {
        return Err(KeyError::InvalidPoint(bytes.len()));
    }
    Ok(bytes)
}

fn pad(raw: &str) -> String {
    let padding = (4 - raw.len() % 4) % 4;
    format!("{raw}{}", "=".repeat(padding))
}

/// Generates a fresh application server key: the uncompressed public point of
/// a new P-256 key pair, base64url encoded. The private half is discarded;
/// only the public key is needed to register with the push service.
pub fn generate_application_server_key() -> String {
    generate_application_server_key_with_rng(&mut OsRng)
}

pub(crate) fn generate_application_server_key_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
) -> String {
    let mut secret = [0u8; 32];
    let key_pair = loop {
        rng.fill_bytes(&mut secret);
        if let Ok(key_pair) = ES256KeyPair::from_bytes(&secret) {
            break key_pair;
        }
    };
    let point = key_pair.key_pair().public_key().to_bytes_uncompressed();
    encode_config(point, URL_SAFE_NO_PAD)
}
