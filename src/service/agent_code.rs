// service/agent_code.rs
use std::future::Future;

use rand::Rng;

pub const MAX_ATTEMPTS: usize = 10;

/// Uppercase ASCII initials of the first two words, padded with `X`.
pub fn initials(full_name: &str) -> String {
    let mut letters: String = full_name
        .split_whitespace()
        .filter_map(|word| word.chars().find(|c| c.is_alphabetic()))
        .map(fold_accent)
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase())
        .take(2)
        .collect();

    while letters.len() < 2 {
        letters.push('X');
    }
    letters
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'Á' | 'À' | 'Ä' | 'Â' => 'A',
        'é' | 'è' | 'ë' | 'ê' | 'É' | 'È' | 'Ë' | 'Ê' => 'E',
        'í' | 'ì' | 'ï' | 'î' | 'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
        'ó' | 'ò' | 'ö' | 'ô' | 'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
        'ú' | 'ù' | 'ü' | 'û' | 'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
        'ñ' | 'Ñ' => 'N',
        'ç' | 'Ç' => 'C',
        other => other,
    }
}

pub fn base_code(initials: &str) -> String {
    let mut rng = rand::rng();
    format!("{}{:04}", initials, rng.random_range(0..10000))
}

fn with_suffix(code: &str) -> String {
    let mut rng = rand::rng();
    format!("{}{:02}", code, rng.random_range(0..100))
}

/// Picks a code not reported as taken by `exists`. The first candidate is
/// `base`; every retry appends a random two-digit suffix to it. Uniqueness is
/// best-effort: two concurrent signups can still race past the check.
pub async fn generate_unique_code<F, Fut, E>(base: String, mut exists: F) -> Result<Option<String>, E>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let mut candidate = base.clone();
    for attempt in 0..MAX_ATTEMPTS {
        if !exists(candidate.clone()).await? {
            return Ok(Some(candidate));
        }
        tracing::debug!("Agent code {} taken (attempt {})", candidate, attempt + 1);
        candidate = with_suffix(&base);
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn initials_from_names() {
        assert_eq!(initials("María López"), "ML");
        assert_eq!(initials("Ángel Ñúñez García"), "AN");
        assert_eq!(initials("juan"), "JX");
        assert_eq!(initials("   "), "XX");
    }

    #[test]
    fn base_code_is_initials_plus_four_digits() {
        let code = base_code("ML");
        assert_eq!(code.len(), 6);
        assert!(code.starts_with("ML"));
        assert!(code[2..].chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn free_base_code_is_used_as_is() {
        let code = generate_unique_code("ML1234".to_string(), |_| async { Ok::<_, ()>(false) })
            .await
            .unwrap();
        assert_eq!(code.as_deref(), Some("ML1234"));
    }

    #[tokio::test]
    async fn collision_appends_two_digit_suffix() {
        let seen = Mutex::new(Vec::new());
        let code = generate_unique_code("ML1234".to_string(), |candidate| {
            seen.lock().unwrap().push(candidate.clone());
            async move { Ok::<_, ()>(candidate == "ML1234") }
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(code.len(), 8);
        assert!(code.starts_with("ML1234"));
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = Mutex::new(0);
        let code = generate_unique_code("ML1234".to_string(), |_| {
            *calls.lock().unwrap() += 1;
            async { Ok::<_, ()>(true) }
        })
        .await
        .unwrap();

        assert!(code.is_none());
        assert_eq!(*calls.lock().unwrap(), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn lookup_errors_propagate() {
        let result = generate_unique_code("ML1234".to_string(), |_| async { Err::<bool, _>("db down") }).await;
        assert_eq!(result, Err("db down"));
    }
}
