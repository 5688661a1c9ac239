/// Replace `${ENV_VAR}` placeholders in raw config text.
///
/// Placeholders whose variable is unset, and malformed (unclosed)
/// placeholders, are emitted unchanged.
pub fn substitute_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 => {
                let name = &after[..end];
                match std::env::var(name) {
                    Ok(val) => out.push_str(&val),
                    Err(_) => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    },
                }
                rest = &after[end + 1..];
            },
            _ => {
                // No closing brace (or empty name): keep the literal text.
                out.push_str("${");
                rest = after;
            },
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
#[allow(unsafe_code)] // env mutation in tests needs unsafe on edition 2024
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_var() {
        unsafe { std::env::set_var("TEMPO_TEST_SUBST_VAR", "hello") };
        assert_eq!(substitute_env("key=${TEMPO_TEST_SUBST_VAR}"), "key=hello");
        unsafe { std::env::remove_var("TEMPO_TEST_SUBST_VAR") };
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_env("${TEMPO_NONEXISTENT_XYZ}"),
            "${TEMPO_NONEXISTENT_XYZ}"
        );
    }

    #[test]
    fn unclosed_placeholder_is_literal() {
        assert_eq!(substitute_env("a=${OOPS"), "a=${OOPS");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("plain text"), "plain text");
    }
}
