//! Password hashing for profile rows

use bcrypt::BcryptError;

/// Hash a password with bcrypt at the given cost
pub fn hash_password(password: &str, cost: u32) -> Result<String, BcryptError> {
    bcrypt::hash(password, cost)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_verifies() {
        let hash = hash_password("correct horse", 4).unwrap();
        assert!(hash.starts_with("$2"));
        assert!(bcrypt::verify("correct horse", &hash).unwrap());
        assert!(!bcrypt::verify("wrong", &hash).unwrap());
    }

    #[test]
    fn test_invalid_cost_rejected() {
        assert!(hash_password("pw", 1).is_err());
    }
}
