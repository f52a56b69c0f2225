use anyhow::Context;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Path of the YAML config file: `APP_CONFIG`, or `config/config.yaml`.
pub fn config_path() -> String {
    std::env::var("APP_CONFIG").unwrap_or_else(|_| "config/config.yaml".into())
}

/// Load YAML from disk, substitute $(VAR)/${VAR} with env vars, then parse.
///
/// A placeholder naming an unset variable fails with
/// `missing environment variable: NAME`, so a service refuses to start with
/// an incomplete configuration.
pub fn load_yaml<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, anyhow::Error> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    parse_yaml(&raw)
}

/// Same as [`load_yaml`] for an in-memory document.
pub fn parse_yaml<T: DeserializeOwned>(raw: &str) -> Result<T, anyhow::Error> {
    let expanded = expand_env_placeholders(raw)?;
    let cfg = serde_yaml::from_str(&expanded).context("parsing config")?;
    Ok(cfg)
}

/// Returns the value of `name` if it is set and non-empty.
pub fn env_override(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Expand $(VAR) and ${VAR} placeholders using environment variables.
/// Notes:
/// - "$$" becomes a literal "$" (escape).
/// - a lone '$' is kept as-is.
pub fn expand_env_placeholders(input: &str) -> Result<String, anyhow::Error> {
    let mut out = String::with_capacity(input.len());
    let mut it = input.chars().peekable();

    while let Some(c) = it.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let end = match it.peek().copied() {
            Some('$') => {
                it.next();
                out.push('$');
                continue;
            }
            Some('(') => ')',
            Some('{') => '}',
            _ => {
                out.push('$');
                continue;
            }
        };
        it.next(); // consume the opening delimiter
        let var = read_until(&mut it, end)
            .with_context(|| format!("unterminated env placeholder: missing '{}'", end))?;
        let val = std::env::var(&var)
            .with_context(|| format!("missing environment variable: {}", var))?;
        out.push_str(&val);
    }

    Ok(out)
}

/// Read characters until we hit `end`, returning the collected string.
/// Consumes the closing delimiter.
fn read_until<I>(it: &mut std::iter::Peekable<I>, end: char) -> Option<String>
where
    I: Iterator<Item = char>,
{
    let mut buf = String::new();
    for ch in it.by_ref() {
        if ch == end {
            return Some(buf);
        }
        buf.push(ch);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serial_test::serial;

    #[derive(Debug, Deserialize)]
    struct TestConfig {
        room: String,
        url: String,
    }

    #[test]
    #[serial]
    fn test_expands_both_placeholder_styles() {
        std::env::set_var("ROOM_SENSORS_TEST_ROOM", "living");
        std::env::set_var("ROOM_SENSORS_TEST_HOST", "db.local");

        let out =
            expand_env_placeholders("room: ${ROOM_SENSORS_TEST_ROOM} host: $(ROOM_SENSORS_TEST_HOST)")
                .unwrap();
        assert_eq!(out, "room: living host: db.local");

        std::env::remove_var("ROOM_SENSORS_TEST_ROOM");
        std::env::remove_var("ROOM_SENSORS_TEST_HOST");
    }

    #[test]
    fn test_escape_and_lone_dollar() {
        assert_eq!(expand_env_placeholders("a$$b").unwrap(), "a$b");
        assert_eq!(expand_env_placeholders("cost: 5$").unwrap(), "cost: 5$");
    }

    #[test]
    #[serial]
    fn test_missing_variable_names_the_variable() {
        std::env::remove_var("ROOM_SENSORS_TEST_MISSING");
        let err = expand_env_placeholders("room: ${ROOM_SENSORS_TEST_MISSING}").unwrap_err();
        assert!(
            format!("{:#}", err).contains("missing environment variable: ROOM_SENSORS_TEST_MISSING")
        );
    }

    #[test]
    fn test_unterminated_placeholder() {
        assert!(expand_env_placeholders("room: ${ROOM").is_err());
    }

    #[test]
    #[serial]
    fn test_parse_yaml_with_placeholders() {
        std::env::set_var("ROOM_SENSORS_TEST_URL", "postgres://localhost/iot_home");
        let cfg: TestConfig = parse_yaml("room: kitchen\nurl: \"${ROOM_SENSORS_TEST_URL}\"\n").unwrap();
        assert_eq!(cfg.room, "kitchen");
        assert_eq!(cfg.url, "postgres://localhost/iot_home");
        std::env::remove_var("ROOM_SENSORS_TEST_URL");
    }

    #[test]
    #[serial]
    fn test_env_override_ignores_blank() {
        std::env::set_var("ROOM_SENSORS_TEST_BLANK", "  ");
        assert_eq!(env_override("ROOM_SENSORS_TEST_BLANK"), None);
        std::env::set_var("ROOM_SENSORS_TEST_BLANK", "x");
        assert_eq!(env_override("ROOM_SENSORS_TEST_BLANK"), Some("x".into()));
        std::env::remove_var("ROOM_SENSORS_TEST_BLANK");
    }
}
