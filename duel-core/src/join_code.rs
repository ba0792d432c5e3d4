use rand::Rng;

/// Uppercase letters and digits only, so codes survive being read aloud
/// or typed on a phone.
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Random shareable join code. Uniqueness is the store's problem; callers
/// retry on collision.
pub fn generate_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CODE_CHARSET.len());
            CODE_CHARSET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_has_requested_length() {
        assert_eq!(generate_code(6).len(), 6);
        assert_eq!(generate_code(10).len(), 10);
    }

    #[test]
    fn test_code_uses_the_charset() {
        let code = generate_code(64);
        assert!(code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
    }

    #[test]
    fn test_codes_vary() {
        let codes: Vec<String> = (0..8).map(|_| generate_code(8)).collect();
        let first = &codes[0];
        assert!(codes.iter().any(|code| code != first));
    }
}
