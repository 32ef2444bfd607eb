/// Replace `${ENV_VAR}` and `${ENV_VAR:-default}` placeholders.
///
/// Unresolvable variables without a default are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// [`substitute_env`] with a custom lookup, so tests don't touch the
/// process environment.
pub fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next();

        let mut body = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            body.push(c);
        }

        if !closed || body.is_empty() {
            // Malformed: emit literally.
            result.push_str("${");
            result.push_str(&body);
            if closed {
                result.push('}');
            }
            continue;
        }

        let (name, default) = match body.split_once(":-") {
            Some((name, default)) => (name, Some(default)),
            None => (body.as_str(), None),
        };

        match (lookup(name).filter(|v| !v.is_empty()), default) {
            (Some(val), _) => result.push_str(&val),
            (None, Some(default)) => result.push_str(default),
            (None, None) => {
                result.push_str("${");
                result.push_str(&body);
                result.push('}');
            },
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn lookup(name: &str) -> Option<String> {
        match name {
            "FSBOT_TEST_TOKEN" => Some("123:abc".into()),
            "FSBOT_EMPTY" => Some(String::new()),
            _ => None,
        }
    }

    #[rstest]
    #[case("token = \"${FSBOT_TEST_TOKEN}\"", "token = \"123:abc\"")]
    #[case("${FSBOT_MISSING}", "${FSBOT_MISSING}")]
    #[case("port = ${FSBOT_PORT:-8443}", "port = 8443")]
    #[case("${FSBOT_TEST_TOKEN:-fallback}", "123:abc")]
    #[case("${FSBOT_EMPTY:-fallback}", "fallback")]
    #[case("cost: $5 and ${", "cost: $5 and ${")]
    #[case("${}", "${}")]
    #[case("plain text", "plain text")]
    fn substitution(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(substitute_env_with(input, lookup), expected);
    }
}
