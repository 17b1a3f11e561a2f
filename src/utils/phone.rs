// utils/phone.rs
use regex::Regex;

/// Hides every digit except the last four, keeping separators so the number
/// still reads like a phone number on the public agent page.
pub fn mask_phone(phone: &str) -> String {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if digits <= 4 {
        return "*".repeat(digits.max(4));
    }

    let mut remaining = digits;
    phone
        .chars()
        .map(|c| {
            if c.is_ascii_digit() {
                remaining -= 1;
                if remaining >= 4 {
                    return '*';
                }
            }
            c
        })
        .collect()
}

/// Strips everything but digits and a leading `+`.
pub fn normalize_phone(phone: &str) -> String {
    let trimmed = phone.trim();
    let leading_plus = trimmed.starts_with('+');
    let digits = Regex::new(r"\D")
        .map(|re| re.replace_all(trimmed, "").into_owned())
        .unwrap_or_else(|_| trimmed.chars().filter(|c| c.is_ascii_digit()).collect());

    if leading_plus {
        format!("+{}", digits)
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_all_but_last_four_digits() {
        assert_eq!(mask_phone("+52 55 1234 5678"), "+** ** **** 5678");
        assert_eq!(mask_phone("5512345678"), "******5678");
    }

    #[test]
    fn short_numbers_are_fully_hidden() {
        assert_eq!(mask_phone("123"), "****");
        assert_eq!(mask_phone(""), "****");
    }

    #[test]
    fn normalizes_separators() {
        assert_eq!(normalize_phone(" +52 (55) 1234-5678 "), "+525512345678");
        assert_eq!(normalize_phone("55.1234.5678"), "5512345678");
    }
}
