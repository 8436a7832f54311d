//! INI parsing logic for converting `Ini` → `Config`.
//!
//! This is the single place where INI key names are mapped to struct fields.
//! Unknown sections and keys are rejected so that typos fail at load time
//! instead of silently falling back to defaults.

use ini::{Ini, Properties};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use super::defaults::*;
use super::file::ConfigError;
use super::settings::*;
use super::units::{parse_compress_opt, parse_period, parse_size_unit};

/// Prefix of per-target replication sections, e.g. `[repl_servers.repl0]`.
pub const REPL_SECTION_PREFIX: &str = "repl_servers.";

const GENERAL_KEYS: &[&str] = &["addr", "port", "walbc_path", "max_concurrent_tasks"];
const APPLY_KEYS: &[&str] = &["keep_period", "threshold_nr", "threshold_size"];
const MERGE_KEYS: &[&str] = &["interval", "max_nr", "max_size", "threshold_nr"];
const REPL_KEYS: &[&str] = &[
    "addr",
    "port",
    "interval",
    "compress",
    "max_merge_size",
    "bulk_size",
];

/// Parse an `Ini` object into a fully validated `Config`.
pub(super) fn parse_ini(ini: &Ini) -> Result<Config, ConfigError> {
    let mut general = None;
    let mut apply = ApplySettings::default();
    let mut merge = MergeSettings::default();
    let mut repl_servers = BTreeMap::new();

    for (name, props) in ini.iter() {
        match name {
            None => {
                if let Some((key, _)) = props.iter().next() {
                    return Err(ConfigError::UnknownKey {
                        section: String::new(),
                        key: key.to_string(),
                    });
                }
            }
            Some("general") => general = Some(parse_general(props)?),
            Some("apply") => apply = parse_apply(props)?,
            Some("merge") => merge = parse_merge(props)?,
            Some(section) => match section.strip_prefix(REPL_SECTION_PREFIX) {
                Some(target) if !target.is_empty() => {
                    let settings = parse_repl_server(section, props)?;
                    repl_servers.insert(target.to_string(), settings);
                }
                _ => return Err(ConfigError::UnknownSection(section.to_string())),
            },
        }
    }

    let general = general.ok_or_else(|| missing("general", "addr"))?;

    Ok(Config {
        general,
        apply,
        merge,
        repl_servers,
    })
}

// =============================================================================
// Sections
// =============================================================================

fn parse_general(props: &Properties) -> Result<GeneralSettings, ConfigError> {
    const SECTION: &str = "general";
    check_keys(SECTION, props, GENERAL_KEYS)?;

    let addr = required_str(SECTION, props, "addr")?;
    let port = parse_port(SECTION, props)?;

    let walbc_path = match props.get("walbc_path").map(str::trim) {
        Some(v) if !v.is_empty() => PathBuf::from(v),
        Some(v) => return Err(invalid(SECTION, "walbc_path", v, "must not be empty")),
        None => default_walbc_path(),
    };

    let max_concurrent_tasks = match props.get("max_concurrent_tasks") {
        Some(v) => match v.trim().parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                return Err(invalid(
                    SECTION,
                    "max_concurrent_tasks",
                    v,
                    "must be a positive integer",
                ))
            }
        },
        None => DEFAULT_MAX_CONCURRENT_TASKS,
    };

    Ok(GeneralSettings {
        addr,
        port,
        walbc_path,
        max_concurrent_tasks,
    })
}

fn parse_apply(props: &Properties) -> Result<ApplySettings, ConfigError> {
    const SECTION: &str = "apply";
    check_keys(SECTION, props, APPLY_KEYS)?;

    let defaults = ApplySettings::default();
    Ok(ApplySettings {
        keep_period: period_or(SECTION, props, "keep_period", defaults.keep_period)?,
        threshold_nr: props
            .get("threshold_nr")
            .map(|v| parse_u64(SECTION, "threshold_nr", v))
            .transpose()?,
        threshold_size: props
            .get("threshold_size")
            .map(|v| parse_size(SECTION, "threshold_size", v))
            .transpose()?,
    })
}

fn parse_merge(props: &Properties) -> Result<MergeSettings, ConfigError> {
    const SECTION: &str = "merge";
    check_keys(SECTION, props, MERGE_KEYS)?;

    let defaults = MergeSettings::default();
    let max_nr = match props.get("max_nr") {
        Some(v) => parse_u64(SECTION, "max_nr", v)?,
        None => defaults.max_nr,
    };
    if max_nr < 2 {
        return Err(invalid(
            SECTION,
            "max_nr",
            &max_nr.to_string(),
            "a merge needs at least 2 diffs",
        ));
    }

    Ok(MergeSettings {
        interval: period_or(SECTION, props, "interval", defaults.interval)?,
        max_nr,
        max_size: size_or(SECTION, props, "max_size", defaults.max_size)?,
        threshold_nr: match props.get("threshold_nr") {
            Some(v) => parse_u64(SECTION, "threshold_nr", v)?,
            None => defaults.threshold_nr,
        },
    })
}

fn parse_repl_server(section: &str, props: &Properties) -> Result<ReplServerSettings, ConfigError> {
    check_keys(section, props, REPL_KEYS)?;

    let compress = match props.get("compress") {
        Some(v) => parse_compress_opt(v).map_err(|e| invalid(section, "compress", v, e.to_string()))?,
        None => default_repl_compress(),
    };

    Ok(ReplServerSettings {
        addr: required_str(section, props, "addr")?,
        port: parse_port(section, props)?,
        interval: period_or(
            section,
            props,
            "interval",
            Duration::from_secs(DEFAULT_REPL_INTERVAL_SECS),
        )?,
        compress,
        max_merge_size: size_or(section, props, "max_merge_size", DEFAULT_REPL_MAX_MERGE_SIZE)?,
        bulk_size: size_or(section, props, "bulk_size", DEFAULT_REPL_BULK_SIZE)?,
    })
}

// =============================================================================
// Helpers
// =============================================================================

fn invalid(section: &str, key: &str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> ConfigError {
    ConfigError::MissingKey {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn check_keys(section: &str, props: &Properties, known: &[&str]) -> Result<(), ConfigError> {
    match props.iter().find(|(key, _)| !known.contains(key)) {
        Some((key, _)) => Err(ConfigError::UnknownKey {
            section: section.to_string(),
            key: key.to_string(),
        }),
        None => Ok(()),
    }
}

fn required_str(section: &str, props: &Properties, key: &str) -> Result<String, ConfigError> {
    match props.get(key).map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        Some(v) => Err(invalid(section, key, v, "must not be empty")),
        None => Err(missing(section, key)),
    }
}

fn parse_port(section: &str, props: &Properties) -> Result<u16, ConfigError> {
    let v = props.get("port").ok_or_else(|| missing(section, "port"))?;
    v.trim()
        .parse()
        .map_err(|_| invalid(section, "port", v, "must be an integer in 0-65535"))
}

fn parse_u64(section: &str, key: &str, v: &str) -> Result<u64, ConfigError> {
    v.trim()
        .parse()
        .map_err(|_| invalid(section, key, v, "must be a non-negative integer"))
}

fn parse_size(section: &str, key: &str, v: &str) -> Result<u64, ConfigError> {
    parse_size_unit(v).map_err(|e| invalid(section, key, v, e.to_string()))
}

fn period_or(
    section: &str,
    props: &Properties,
    key: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match props.get(key) {
        Some(v) => parse_period(v).map_err(|e| invalid(section, key, v, e.to_string())),
        None => Ok(default),
    }
}

fn size_or(section: &str, props: &Properties, key: &str, default: u64) -> Result<u64, ConfigError> {
    match props.get(key) {
        Some(v) => parse_size(section, key, v),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::super::units::{Codec, CompressOpt};
    use super::*;

    const SAMPLE: &str = r#"
[general]
addr = 192.168.0.1
port = 10000
walbc_path = binsrc/walbc
max_concurrent_tasks = 10

[apply]
keep_period = 14d

[merge]
interval = 10
max_nr = 10
max_size = 1M
threshold_nr = 5

[repl_servers.repl0]
addr = 192.168.0.2
port = 10001
interval = 3d
compress = snappy:3:4
max_merge_size = 5K
bulk_size = 40

[repl_servers.repl1]
addr = 192.168.0.3
port = 10002
interval = 2h
compress = gzip
max_merge_size = 2M
bulk_size = 400
"#;

    fn load(content: &str) -> Result<Config, ConfigError> {
        Config::from_ini_str(content)
    }

    #[test]
    fn test_full_document() {
        let cfg = load(SAMPLE).unwrap();

        let general = &cfg.general;
        assert_eq!(general.addr, "192.168.0.1");
        assert_eq!(general.port, 10000);
        assert_eq!(general.walbc_path, PathBuf::from("binsrc/walbc"));
        assert_eq!(general.max_concurrent_tasks, 10);

        assert_eq!(cfg.apply.keep_period, Duration::from_secs(14 * 86400));
        assert!(!cfg.apply.fresh_apply_enabled());

        let merge = &cfg.merge;
        assert_eq!(merge.interval, Duration::from_secs(10));
        assert_eq!(merge.max_nr, 10);
        assert_eq!(merge.max_size, 1024 * 1024);
        assert_eq!(merge.threshold_nr, 5);

        let r = &cfg.repl_servers["repl0"];
        assert_eq!(r.addr, "192.168.0.2");
        assert_eq!(r.port, 10001);
        assert_eq!(r.interval, Duration::from_secs(3 * 86400));
        assert_eq!(r.compress, CompressOpt::new(Codec::Snappy, 3, 4));
        assert_eq!(r.max_merge_size, 5 * 1024);
        assert_eq!(r.bulk_size, 40);

        let r = &cfg.repl_servers["repl1"];
        assert_eq!(r.addr, "192.168.0.3");
        assert_eq!(r.port, 10002);
        assert_eq!(r.interval, Duration::from_secs(2 * 3600));
        assert_eq!(r.compress, CompressOpt::new(Codec::Gzip, 0, 0));
        assert_eq!(r.max_merge_size, 2 * 1024 * 1024);
        assert_eq!(r.bulk_size, 400);

        assert_eq!(cfg.repl_servers.len(), 2);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let cfg = load(
            r#"
[general]
addr = 10.0.0.1
port = 10200

[repl_servers.far]
addr = 10.0.0.9
port = 10201
"#,
        )
        .unwrap();

        assert_eq!(cfg.general.max_concurrent_tasks, DEFAULT_MAX_CONCURRENT_TASKS);
        assert_eq!(cfg.general.walbc_path, PathBuf::from(DEFAULT_WALBC_PATH));
        assert_eq!(cfg.apply, ApplySettings::default());
        assert_eq!(cfg.merge, MergeSettings::default());

        let far = &cfg.repl_servers["far"];
        assert_eq!(far.interval, Duration::from_secs(DEFAULT_REPL_INTERVAL_SECS));
        assert_eq!(far.compress, CompressOpt::default());
        assert_eq!(far.bulk_size, DEFAULT_REPL_BULK_SIZE);
    }

    #[test]
    fn test_repl_targets_do_not_inherit() {
        let cfg = load(
            r#"
[general]
addr = a0
port = 1

[repl_servers.a]
addr = a1
port = 2
compress = lzma:5
interval = 1h

[repl_servers.b]
addr = a2
port = 3
"#,
        )
        .unwrap();

        assert_eq!(cfg.repl_servers["a"].compress, CompressOpt::new(Codec::Lzma, 5, 0));
        assert_eq!(cfg.repl_servers["b"].compress, CompressOpt::default());
        assert_eq!(
            cfg.repl_servers["b"].interval,
            Duration::from_secs(DEFAULT_REPL_INTERVAL_SECS)
        );
    }

    #[test]
    fn test_fresh_apply_thresholds() {
        let cfg = load(
            r#"
[general]
addr = a0
port = 1

[apply]
threshold_nr = 50
threshold_size = 2G
"#,
        )
        .unwrap();

        assert_eq!(cfg.apply.threshold_nr, Some(50));
        assert_eq!(cfg.apply.threshold_size, Some(2 * 1024 * 1024 * 1024));
        assert!(cfg.apply.fresh_apply_enabled());
    }

    #[test]
    fn test_missing_general_section() {
        let err = load("[apply]\nkeep_period = 1d\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { ref section, .. } if section == "general"));
    }

    #[test]
    fn test_missing_port() {
        let err = load("[general]\naddr = a0\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { ref key, .. } if key == "port"));
    }

    #[test]
    fn test_repl_missing_addr() {
        let err = load("[general]\naddr = a0\nport = 1\n[repl_servers.r]\nport = 2\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingKey { ref section, ref key } if section == "repl_servers.r" && key == "addr"
        ));
    }

    #[test]
    fn test_invalid_period() {
        let err = load("[general]\naddr = a0\nport = 1\n[apply]\nkeep_period = 14w\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "keep_period"));
    }

    #[test]
    fn test_invalid_size() {
        let err = load("[general]\naddr = a0\nport = 1\n[merge]\nmax_size = 1T\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "max_size"));
    }

    #[test]
    fn test_unknown_codec() {
        let err = load(
            "[general]\naddr = a0\nport = 1\n[repl_servers.r]\naddr = a1\nport = 2\ncompress = zstd\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "compress"));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = load("[general]\naddr = a0\nport = 1\nmax_concurrent_tasks = 0\n").unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "max_concurrent_tasks")
        );
    }

    #[test]
    fn test_merge_max_nr_below_two_rejected() {
        let err = load("[general]\naddr = a0\nport = 1\n[merge]\nmax_nr = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "max_nr"));
    }

    #[test]
    fn test_bad_port() {
        let err = load("[general]\naddr = a0\nport = 70000\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "port"));
    }

    #[test]
    fn test_unknown_section() {
        let err = load("[general]\naddr = a0\nport = 1\n[proxy]\naddr = p0\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSection(ref s) if s == "proxy"));

        let err = load("[general]\naddr = a0\nport = 1\n[repl_servers.]\naddr = p0\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSection(_)));
    }

    #[test]
    fn test_unknown_key() {
        let err = load("[general]\naddr = a0\nport = 1\nmax_tasks = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey { ref key, .. } if key == "max_tasks"));
    }
}
