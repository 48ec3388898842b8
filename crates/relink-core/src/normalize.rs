//! Normalization rules for candidate matching.
//!
//! These functions define what "the same name" and "the same contact"
//! mean, so they directly determine match/no-match outcomes. Matching
//! keys are always case-insensitive; the field-level diff compares
//! literal values separately.
//!
//! Empty input never produces a key: an empty normalized name must not
//! match another empty normalized name.

/// Legal-form suffixes stripped from the end of organization names
/// before comparison ("Acme Inc" and "Acme" normalize identically).
const LEGAL_SUFFIXES: &[&str] = &[
    "inc",
    "incorporated",
    "ltd",
    "limited",
    "llc",
    "corp",
    "corporation",
    "co",
    "plc",
    "gmbh",
    "ag",
    "sa",
    "sarl",
    "sas",
    "bv",
];

/// Normalize a name for matching: trim, collapse internal whitespace,
/// case-fold, and drop trailing legal-form suffixes.
///
/// Returns `None` for empty or all-suffix input.
#[must_use]
pub fn name_key(raw: &str) -> Option<String> {
    let mut tokens: Vec<String> = raw
        .split_whitespace()
        .map(|t| {
            t.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|t| !t.is_empty())
        .collect();

    // A name that is nothing but a suffix token keeps its key ("Co" the
    // company must not vanish), hence the len() > 1 guard.
    while tokens.len() > 1 {
        let last = tokens.last().map(String::as_str);
        if last.is_some_and(|t| LEGAL_SUFFIXES.contains(&t)) {
            tokens.pop();
        } else {
            break;
        }
    }

    if tokens.is_empty() {
        return None;
    }
    Some(tokens.join(" "))
}

/// Normalize an email address for matching: trim and lower-case.
///
/// Returns `None` unless the value contains an `@` with text on both sides.
#[must_use]
pub fn email_key(raw: &str) -> Option<String> {
    let trimmed = raw.trim().to_lowercase();
    let (local, domain) = trimmed.split_once('@')?;
    if local.is_empty() || domain.is_empty() {
        return None;
    }
    Some(trimmed)
}

/// Normalize a phone number for matching: digits only, with the
/// international call prefix (`+` or `00`) removed so that
/// `+41 22 555 01 02` and `0041225550102` produce the same key.
///
/// Returns `None` when fewer than 5 digits remain; shorter strings are
/// extensions or junk, not dialable numbers.
#[must_use]
pub fn phone_key(raw: &str) -> Option<String> {
    let mut digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    // "+41..." already reduces to "41..."; only the literal 00 call
    // prefix needs stripping.
    if let Some(rest) = digits.strip_prefix("00") {
        digits = rest.to_string();
    }

    if digits.len() < 5 {
        return None;
    }
    Some(digits)
}

/// Contact key for a record: the normalized email when present,
/// otherwise the normalized phone.
#[must_use]
pub fn contact_key(email: Option<&str>, phone: Option<&str>) -> Option<String> {
    email
        .and_then(email_key)
        .or_else(|| phone.and_then(phone_key))
}
