use super::errors::PolicyError;

/// Punctuation accepted as the "special character" class.
pub const SYMBOLS: &str = "!@#$%^&*(),.?\":{}|<>";

const MIN_LENGTH: usize = 8;

/// Check a plaintext password against the account password policy.
///
/// Requirements: at least 8 characters, at least one uppercase letter, at
/// least one digit, and at least one symbol from [`SYMBOLS`].
///
/// Pure and side-effect-free; the first unmet requirement is reported.
///
/// # Errors
/// * `TooShort` - fewer than 8 characters
/// * `MissingUppercase` - no uppercase letter
/// * `MissingDigit` - no digit
/// * `MissingSymbol` - no accepted special character
pub fn validate_policy(password: &str) -> Result<(), PolicyError> {
    if password.chars().count() < MIN_LENGTH {
        return Err(PolicyError::TooShort { min: MIN_LENGTH });
    }

    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(PolicyError::MissingUppercase);
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PolicyError::MissingDigit);
    }

    if !password.chars().any(|c| SYMBOLS.contains(c)) {
        return Err(PolicyError::MissingSymbol);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_password() {
        assert_eq!(validate_policy("Abc12345!"), Ok(()));
    }

    #[test]
    fn test_too_short() {
        assert_eq!(
            validate_policy("short1!"),
            Err(PolicyError::TooShort { min: 8 })
        );
    }

    #[test]
    fn test_missing_uppercase() {
        assert_eq!(
            validate_policy("abcdefgh1!"),
            Err(PolicyError::MissingUppercase)
        );
    }

    #[test]
    fn test_missing_digit() {
        assert_eq!(validate_policy("Abcdefgh!"), Err(PolicyError::MissingDigit));
    }

    #[test]
    fn test_missing_symbol() {
        assert_eq!(
            validate_policy("Abcdefgh1"),
            Err(PolicyError::MissingSymbol)
        );
    }

    #[test]
    fn test_each_symbol_is_accepted() {
        for symbol in SYMBOLS.chars() {
            let password = format!("Abcdefg1{}", symbol);
            assert_eq!(validate_policy(&password), Ok(()), "symbol {:?}", symbol);
        }
    }
}
