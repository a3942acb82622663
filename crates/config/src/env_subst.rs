/// Replace `${ENV_VAR}` placeholders in raw config text.
///
/// Lets secrets like the client id live in the environment while the rest
/// of the config stays in a file. Unresolvable variables are left as-is.
pub fn substitute_env(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next(); // consume '{'

        let mut var_name = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            var_name.push(c);
        }

        match (closed && !var_name.is_empty())
            .then(|| std::env::var(&var_name).ok())
            .flatten()
        {
            Some(val) => result.push_str(&val),
            None => {
                // Unknown or malformed — emit the literal text back.
                result.push_str("${");
                result.push_str(&var_name);
                if closed {
                    result.push('}');
                }
            },
        }
    }

    result
}
