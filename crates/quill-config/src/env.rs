use std::sync::OnceLock;

use regex::Regex;

/// Expand `{{ env.VAR }}` placeholders in a raw TOML string
///
/// An optional fallback can be supplied with
/// `{{ env.VAR | default("fallback") }}`; when the variable is unset the
/// fallback is substituted instead of returning an error. Lines starting
/// with `#` (TOML comments) are passed through unchanged.
pub fn expand_env(input: &str) -> Result<String, String> {
    fn re() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| {
            Regex::new(r#"\{\{\s*env\.([A-Za-z0-9_]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#)
                .expect("must be valid regex")
        })
    }

    let mut output = String::with_capacity(input.len());

    for (i, line) in input.lines().enumerate() {
        if i > 0 {
            output.push('\n');
        }

        if line.trim_start().starts_with('#') {
            output.push_str(line);
            continue;
        }

        let mut last_end = 0;
        for captures in re().captures_iter(line) {
            let overall = captures.get(0).expect("regex match");
            let var_name = captures.get(1).expect("variable name").as_str();
            let fallback = captures.get(2).map(|m| m.as_str());

            output.push_str(&line[last_end..overall.start()]);

            match std::env::var(var_name) {
                Ok(value) => output.push_str(&value),
                Err(_) => match fallback {
                    Some(default) => output.push_str(default),
                    None => return Err(format!("environment variable not found: `{var_name}`")),
                },
            }

            last_end = overall.end();
        }
        output.push_str(&line[last_end..]);
    }

    if input.ends_with('\n') {
        output.push('\n');
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_without_placeholders() {
        let input = "key = \"value\"";
        assert_eq!(expand_env(input).unwrap(), input);
    }

    #[test]
    fn expands_set_variable() {
        temp_env::with_var("QUILL_TEST_VAR", Some("hello"), || {
            let result = expand_env("key = \"{{ env.QUILL_TEST_VAR }}\"").unwrap();
            assert_eq!(result, "key = \"hello\"");
        });
    }

    #[test]
    fn missing_variable_errors() {
        temp_env::with_var_unset("QUILL_MISSING", || {
            let err = expand_env("key = \"{{ env.QUILL_MISSING }}\"").unwrap_err();
            assert!(err.contains("QUILL_MISSING"));
        });
    }

    #[test]
    fn default_used_when_unset() {
        temp_env::with_var_unset("QUILL_OPTIONAL", || {
            let result =
                expand_env("key = \"{{ env.QUILL_OPTIONAL | default(\"fallback\") }}\"").unwrap();
            assert_eq!(result, "key = \"fallback\"");
        });
    }

    #[test]
    fn comment_lines_are_not_expanded() {
        temp_env::with_var_unset("QUILL_MISSING", || {
            let input = "# key = \"{{ env.QUILL_MISSING }}\"";
            assert_eq!(expand_env(input).unwrap(), input);
        });
    }
}
