//! Shared utility functions for the server

use rand::Rng;

pub use shared::util::{now_millis, snowflake_id};

const TICKET_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const TICKET_CODE_LEN: usize = 10;

/// `n` distinct snowflake ids for rows created in the same millisecond
pub fn snowflake_ids(n: usize) -> Vec<i64> {
    let mut ids: Vec<i64> = Vec::with_capacity(n);
    while ids.len() < n {
        let id = snowflake_id();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Six-digit one-time code
pub fn generate_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    code.to_string()
}

/// `TKT-` followed by 10 uppercase alphanumerics
pub fn generate_ticket_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..TICKET_CODE_LEN)
        .map(|_| TICKET_CODE_ALPHABET[rng.gen_range(0..TICKET_CODE_ALPHABET.len())] as char)
        .collect();
    format!("TKT-{suffix}")
}

pub fn hash_code(code: &str) -> Result<String, argon2::password_hash::Error> {
    use argon2::password_hash::SaltString;
    use argon2::password_hash::rand_core::OsRng;
    use argon2::{Argon2, PasswordHasher};
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(code.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn verify_code(code: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(code.as_bytes(), &parsed)
        .is_ok()
}

/// Format cents as a decimal amount ("12.50")
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Trim an optional free-text field, mapping blank to `None`
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
