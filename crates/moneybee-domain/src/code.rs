//! Transaction-code generation
//!
//! The recipient presents a 10-character code over `[A-Z0-9]` at pickup.
//! Codes are drawn from the thread-local CSPRNG; the store's unique
//! constraint is the hard guarantee, generation here is a best-effort
//! pre-check away from collisions.

use rand::Rng;

/// Alphabet transaction codes are drawn from
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Fixed code length
pub const CODE_LENGTH: usize = 10;

/// Draw a fresh transaction code
pub fn generate_transaction_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..CODE_ALPHABET.len());
            CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Whether `code` has the exact shape a generated code has
pub fn is_valid_transaction_code(code: &str) -> bool {
    code.len() == CODE_LENGTH
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_match_the_alphabet() {
        for _ in 0..100 {
            let code = generate_transaction_code();
            assert!(is_valid_transaction_code(&code), "bad code: {}", code);
        }
    }

    #[test]
    fn validation_rejects_wrong_shapes() {
        assert!(!is_valid_transaction_code(""));
        assert!(!is_valid_transaction_code("ABC123"));
        assert!(!is_valid_transaction_code("abcdefghij"));
        assert!(!is_valid_transaction_code("ABCDE-1234"));
        assert!(!is_valid_transaction_code("ABCDE12345X"));
        assert!(is_valid_transaction_code("A1B2C3D4E5"));
    }
}
