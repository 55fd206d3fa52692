use std::{env, path::PathBuf, time::Duration};

fn home_dir() -> PathBuf {
    env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir())
}

fn xdg_dir(var: &str, fallback: &str) -> PathBuf {
    match env::var(var) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => home_dir().join(fallback),
    }
}

pub fn xdg_config_home() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

pub fn xdg_data_home() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share")
}

pub fn xdg_cache_home() -> PathBuf {
    xdg_dir("XDG_CACHE_HOME", ".cache")
}

/// Expands a leading `~` to the user's home directory.
pub fn resolve_path(path: &str) -> PathBuf {
    match path.strip_prefix('~') {
        Some(rest) => home_dir().join(rest.trim_start_matches('/')),
        None => PathBuf::from(path),
    }
}

/// Parses a compound duration such as `30m`, `1h30m` or `45s`.
///
/// Units are `s`, `m`, `h` and `d`. Every number needs a unit; a bare number,
/// an unknown unit, or an empty string yields `None`.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let mut total_secs: u64 = 0;
    let mut digits = String::new();

    for c in input.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }

        let value: u64 = digits.parse().ok()?;
        digits.clear();

        let unit = match c {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            'd' => 24 * 60 * 60,
            _ => return None,
        };

        total_secs = total_secs.checked_add(value.checked_mul(unit)?)?;
    }

    if !digits.is_empty() {
        return None;
    }

    Some(Duration::from_secs(total_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("45s"), Some(Duration::from_secs(45)));
        assert_eq!(parse_duration("30m"), Some(Duration::from_secs(30 * 60)));
        assert_eq!(
            parse_duration("1h30m"),
            Some(Duration::from_secs(90 * 60))
        );
        assert_eq!(
            parse_duration("1d"),
            Some(Duration::from_secs(24 * 60 * 60))
        );
        assert_eq!(parse_duration(" 2h "), Some(Duration::from_secs(7200)));
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("30"), None);
        assert_eq!(parse_duration("1h30"), None);
        assert_eq!(parse_duration("10x"), None);
        assert_eq!(parse_duration("m"), None);
        assert_eq!(parse_duration("99999999999999999999d"), None);
    }

    #[test]
    fn test_resolve_path_tilde() {
        let resolved = resolve_path("~/gavel/db");
        assert!(resolved.ends_with("gavel/db"));
        assert!(!resolved.to_string_lossy().starts_with('~'));

        assert_eq!(resolve_path("/var/lib/gavel"), PathBuf::from("/var/lib/gavel"));
    }
}
