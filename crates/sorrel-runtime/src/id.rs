//! Generated-identifier strategies for auto fields.

use std::sync::Mutex;

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// Process-wide generator shared by id strategies that need randomness.
static RNG: Lazy<Mutex<StdRng>> = Lazy::new(|| Mutex::new(StdRng::from_os_rng()));

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// How an auto field obtains its value on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdStrategy {
    /// Integer key assigned by the database.
    AutoIncrement,
    /// 26-character Crockford-base32 ULID.
    Ulid,
    /// Random UUID (version 4).
    UuidV4,
    /// Time-ordered UUID (version 7).
    UuidV7,
    /// 21-character NanoID.
    NanoId,
    /// CUID-shaped collision-resistant id.
    Cuid,
}

impl IdStrategy {
    /// Parses a strategy name as it appears in schema metadata.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "increment" | "autoincrement" => Some(Self::AutoIncrement),
            "ulid" => Some(Self::Ulid),
            "uuid" | "uuidv4" => Some(Self::UuidV4),
            "uuidv7" => Some(Self::UuidV7),
            "nanoid" => Some(Self::NanoId),
            "cuid" => Some(Self::Cuid),
            _ => None,
        }
    }

    /// Generates a fresh id; `None` for [`IdStrategy::AutoIncrement`],
    /// which delegates to the database.
    #[must_use]
    pub fn generate(&self) -> Option<String> {
        match self {
            Self::AutoIncrement => None,
            Self::Ulid => Some(ulid::Ulid::new().to_string()),
            Self::UuidV4 => Some(uuid::Uuid::new_v4().to_string()),
            Self::UuidV7 => Some(uuid::Uuid::now_v7().to_string()),
            Self::NanoId => Some(nanoid::nanoid!()),
            Self::Cuid => Some(cuid()),
        }
    }
}

/// A CUID-shaped id: `c`, millisecond timestamp and twelve random
/// characters, all base36.
fn cuid() -> String {
    let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let mut out = String::with_capacity(24);
    out.push('c');
    out.push_str(&to_base36(millis));
    let mut rng = RNG.lock().expect("id generator poisoned");
    for _ in 0..12 {
        let idx = rng.random_range(0..BASE36.len());
        out.push(BASE36[idx] as char);
    }
    out
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize] as char);
        n /= 36;
    }
    digits.reverse();
    digits.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(IdStrategy::parse("ulid"), Some(IdStrategy::Ulid));
        assert_eq!(IdStrategy::parse("uuidv7"), Some(IdStrategy::UuidV7));
        assert_eq!(IdStrategy::parse("bogus"), None);
    }

    #[test]
    fn test_autoincrement_defers_to_database() {
        assert_eq!(IdStrategy::AutoIncrement.generate(), None);
    }

    #[test]
    fn test_ulid_shape() {
        let id = IdStrategy::Ulid.generate().unwrap();
        assert_eq!(id.len(), 26);
    }

    #[test]
    fn test_uuid_shapes() {
        let v4 = IdStrategy::UuidV4.generate().unwrap();
        let v7 = IdStrategy::UuidV7.generate().unwrap();
        assert_eq!(v4.len(), 36);
        assert_eq!(&v4[14..15], "4");
        assert_eq!(&v7[14..15], "7");
    }

    #[test]
    fn test_nanoid_shape() {
        assert_eq!(IdStrategy::NanoId.generate().unwrap().len(), 21);
    }

    #[test]
    fn test_cuid_shape() {
        let id = IdStrategy::Cuid.generate().unwrap();
        assert!(id.starts_with('c'));
        assert!(id.len() > 13);
        assert!(id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_cuid_uniqueness() {
        let a = IdStrategy::Cuid.generate().unwrap();
        let b = IdStrategy::Cuid.generate().unwrap();
        assert_ne!(a, b);
    }
}
