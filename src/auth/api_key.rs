//! API key format: `lifeos_{prefix8}_{secret32}` over `[a-z0-9]`.
//!
//! Only `lifeos_{prefix8}` and base64(SHA-256(full key)) are persisted.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::Rng;
use sha2::{Digest, Sha256};

pub const KEY_SCHEME: &str = "lifeos";
const PREFIX_LEN: usize = 8;
const SECRET_LEN: usize = 32;
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// A freshly generated key. `key` is shown to the user once.
#[derive(Debug, Clone)]
pub struct GeneratedApiKey {
    pub key: String,
    pub prefix: String,
    pub hash: String,
}

pub fn generate() -> GeneratedApiKey {
    let mut rng = rand::thread_rng();
    let mut random = |len: usize| -> String {
        (0..len)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect()
    };

    let prefix = format!("{}_{}", KEY_SCHEME, random(PREFIX_LEN));
    let key = format!("{}_{}", prefix, random(SECRET_LEN));
    let hash = hash_key(&key);

    GeneratedApiKey { key, prefix, hash }
}

pub fn hash_key(key: &str) -> String {
    BASE64.encode(Sha256::digest(key.as_bytes()))
}

/// First two `_`-separated parts, e.g. `lifeos_ab12cd34`.
pub fn extract_prefix(key: &str) -> Option<String> {
    let mut parts = key.split('_');
    let scheme = parts.next()?;
    let prefix = parts.next()?;
    if scheme.is_empty() || prefix.is_empty() {
        return None;
    }
    Some(format!("{}_{}", scheme, prefix))
}

/// Shape check before touching the database.
pub fn is_well_formed(key: &str) -> bool {
    let parts: Vec<&str> = key.split('_').collect();
    let valid = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| ALPHABET.contains(&b));
    parts.len() == 3 && parts[0] == KEY_SCHEME && valid(parts[1], PREFIX_LEN) && valid(parts[2], SECRET_LEN)
}

/// Compare `key` against a stored hash in constant time.
pub fn verify(key: &str, stored_hash: &str) -> bool {
    constant_time_eq(hash_key(key).as_bytes(), stored_hash.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_has_expected_shape() {
        let generated = generate();
        assert!(is_well_formed(&generated.key), "{}", generated.key);
        assert!(generated.key.starts_with(&format!("{}_", generated.prefix)));
        assert_eq!(generated.prefix.len(), "lifeos_".len() + 8);
        assert_eq!(generated.key.len(), "lifeos_".len() + 8 + 1 + 32);
    }

    #[test]
    fn validates_against_stored_hash() {
        let generated = generate();
        assert!(verify(&generated.key, &generated.hash));
        assert!(!verify(&format!("{}x", generated.key), &generated.hash));
        assert!(!verify(&generate().key, &generated.hash));
    }

    #[test]
    fn prefix_is_first_two_parts() {
        assert_eq!(extract_prefix("lifeos_abcd1234_secret").as_deref(), Some("lifeos_abcd1234"));
        assert_eq!(extract_prefix("lifeos"), None);
        assert_eq!(extract_prefix("_abc_def"), None);
        let generated = generate();
        assert_eq!(extract_prefix(&generated.key), Some(generated.prefix));
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!(!is_well_formed("lifeos_ABCDEFGH_0123456789abcdef0123456789abcdef"));
        assert!(!is_well_formed("other_abcdefgh_0123456789abcdef0123456789abcdef"));
        assert!(!is_well_formed("lifeos_abcdefgh_short"));
        assert!(is_well_formed("lifeos_abcdefgh_0123456789abcdef0123456789abcdef"));
    }

    #[test]
    fn hash_is_base64_sha256() {
        // 32 bytes -> 44 base64 characters
        assert_eq!(hash_key("lifeos_x_y").len(), 44);
        assert_eq!(hash_key("abc"), "ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0=");
    }
}
