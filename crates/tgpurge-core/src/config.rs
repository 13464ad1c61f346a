use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    chunk::ChunkSize,
    errors::Error,
    locator::PageSize,
    orchestrator::{ChatSelector, CleanupSettings},
    scrubber::ScrubSettings,
    Result,
};

/// Typed configuration, read from the environment (and `.env` if present).
#[derive(Clone, Debug)]
pub struct Config {
    // Bridge to the authenticated account
    pub bridge_url: String,
    pub bridge_token: Option<String>,
    pub http_timeout: Duration,

    // What to clean
    pub selector: ChatSelector,
    pub cleanup: CleanupSettings,

    // Audit
    pub audit_log_path: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Every bound is checked here, before
    /// any remote call can happen.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).and_then(non_empty);

        let bridge_url = var("PURGE_BRIDGE_URL").ok_or_else(|| {
            Error::Config("PURGE_BRIDGE_URL environment variable is required".to_string())
        })?;
        let bridge_url = bridge_url.trim().trim_end_matches('/').to_string();
        let bridge_token = var("PURGE_BRIDGE_TOKEN");
        let http_timeout =
            Duration::from_millis(parse_num(&var, "PURGE_HTTP_TIMEOUT_MS")?.unwrap_or(30_000));

        let selector = parse_selector(var("PURGE_CHATS"))?;

        let page_size = PageSize::new(parse_num(&var, "PURGE_SEARCH_PAGE_SIZE")?.unwrap_or(100))?;
        let chunk_size =
            ChunkSize::new(parse_num(&var, "PURGE_DELETE_CHUNK_SIZE")?.unwrap_or(100))?;

        let defaults = ScrubSettings::default();
        let scan_cap = parse_num(&var, "PURGE_REACTION_SCAN_CAP")?.unwrap_or(defaults.scan_cap);
        if scan_cap == 0 {
            return Err(Error::Config(
                "PURGE_REACTION_SCAN_CAP must be at least 1 (use PURGE_SKIP_REACTIONS instead)"
                    .to_string(),
            ));
        }
        let scrub = ScrubSettings {
            scan_cap,
            inspect_pause: parse_num(&var, "PURGE_INSPECT_PAUSE_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.inspect_pause),
            reaction_pause: parse_num(&var, "PURGE_REACTION_PAUSE_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.reaction_pause),
        };

        let cleanup = CleanupSettings {
            page_size,
            chunk_size,
            scrub,
            skip_reactions: parse_bool(&var, "PURGE_SKIP_REACTIONS").unwrap_or(false),
            dry_run: parse_bool(&var, "PURGE_DRY_RUN").unwrap_or(false),
        };

        let audit_log_path = var("PURGE_AUDIT_LOG_PATH").map(PathBuf::from);

        Ok(Self {
            bridge_url,
            bridge_token,
            http_timeout,
            selector,
            cleanup,
            audit_log_path,
        })
    }
}

fn parse_selector(v: Option<String>) -> Result<ChatSelector> {
    let Some(v) = v else {
        return Ok(ChatSelector::All);
    };
    if v.trim().eq_ignore_ascii_case("all") {
        return Ok(ChatSelector::All);
    }

    let mut ids = Vec::new();
    for part in v.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let id = part
            .parse::<i64>()
            .map_err(|_| Error::Config(format!("PURGE_CHATS: invalid chat id {part:?}")))?;
        ids.push(id);
    }
    if ids.is_empty() {
        return Err(Error::Config(
            "PURGE_CHATS must be \"all\" or a comma separated list of chat ids".to_string(),
        ));
    }
    Ok(ChatSelector::Ids(ids))
}

fn parse_num<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = var(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key}: expected a non-negative number, got {raw:?}")))
}

fn parse_bool(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    var(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
