use rand::{distributions::Alphanumeric, thread_rng, Rng};

/// Opaque alphanumeric token embedded in signature links. Not a credential
/// for anything but the one sheet it is stored against.
pub fn generate_signature_token(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_has_requested_length() {
        assert_eq!(generate_signature_token(32).len(), 32);
        assert_eq!(generate_signature_token(0).len(), 0);
    }

    #[test]
    fn token_is_alphanumeric() {
        let token = generate_signature_token(64);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn tokens_are_not_repeated() {
        assert_ne!(generate_signature_token(32), generate_signature_token(32));
    }
}
