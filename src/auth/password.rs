use rand::RngCore;
use sha2::{Digest, Sha256};

/// Salted credentials ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecuredPassword {
    pub password_hash: String,
    pub salt_value: String,
}

/// 32 random bytes, hex encoded
pub fn generate_salt() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn secure(password: &str) -> SecuredPassword {
    let salt_value = generate_salt();
    SecuredPassword {
        password_hash: hash_password(password, &salt_value),
        salt_value,
    }
}

/// Constant-time comparison of a candidate password against a stored hash
pub fn verify(password: &str, salt: &str, expected_hash: &str) -> bool {
    let candidate = hash_password(password, salt);
    let (a, b) = (candidate.as_bytes(), expected_hash.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salts_are_64_hex_characters_and_unique() {
        let a = generate_salt();
        let b = generate_salt();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn hash_covers_password_then_salt() {
        // sha256("passwordsalt")
        assert_eq!(
            hash_password("password", "salt"),
            "7a37b85c8918eac19a9089c0fa5a2ab4dce3f90528dcdeec108b23ddf3607b99"
        );
    }

    #[test]
    fn verify_accepts_only_the_original_password() {
        let secured = secure("password123");
        assert!(verify("password123", &secured.salt_value, &secured.password_hash));
        assert!(!verify("password124", &secured.salt_value, &secured.password_hash));
        assert!(!verify("password123", &secured.salt_value, "short"));
    }
}
