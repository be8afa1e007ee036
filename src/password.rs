use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// hash
///
/// One-way hashes a plaintext password with Argon2id and a fresh random salt.
/// The returned PHC string embeds algorithm, parameters, and salt, so `verify`
/// needs nothing besides the digest itself.
pub fn hash(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|digest| digest.to_string())
}

/// verify
///
/// Checks a candidate password against a stored PHC digest. A malformed digest
/// simply fails verification; it is never an error surfaced to the caller, so
/// the login path stays uniform for every failure mode.
pub fn verify(password: &str, digest: &str) -> bool {
    PasswordHash::new(digest)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
