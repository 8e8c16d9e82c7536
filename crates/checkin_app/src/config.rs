use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use checkin_engine::{ProfileError, SiteProfile};
use checkin_logging::checkin_info;
use clap::Parser;

use crate::logging::LogDestination;

/// Daily check-in for session-authenticated forums.
///
/// Credentials come from the environment variable each profile names
/// (`MOESHARE_DAYSIGN`, `MANHUABUDANG_DAYSIGN` for the built-in profiles).
/// Notifications go to Telegram when `TG_BOT_TOKEN` and `TG_USER_ID` are set.
#[derive(Parser, Debug)]
#[command(name = "checkin", version)]
pub struct Args {
    /// Profile to run; repeat for several. Defaults to every profile.
    #[arg(short, long = "site", value_name = "NAME")]
    pub sites: Vec<String>,

    /// RON file with a list of site profiles, replacing the built-in ones.
    #[arg(short, long, value_name = "FILE")]
    pub profiles: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogDestination::Terminal)]
    pub log: LogDestination,

    /// Log at debug level.
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the available profiles and exit.
    #[arg(long)]
    pub list: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read profiles from {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse profiles in {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("{path:?} defines no profiles")]
    Empty { path: PathBuf },
    #[error("profile {0:?} is defined more than once")]
    Duplicate(String),
    #[error(transparent)]
    Invalid(#[from] ProfileError),
    #[error("unknown site {name:?}; available: {available}")]
    UnknownSite { name: String, available: String },
}

/// Built-in presets, or the profiles in `path` when given. Every profile is validated.
pub fn load_profiles(path: Option<&Path>) -> Result<Vec<SiteProfile>, ConfigError> {
    let profiles = match path {
        None => SiteProfile::builtin(),
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            let profiles: Vec<SiteProfile> =
                ron::from_str(&text).map_err(|err| ConfigError::Parse {
                    path: path.to_path_buf(),
                    message: err.to_string(),
                })?;
            if profiles.is_empty() {
                return Err(ConfigError::Empty {
                    path: path.to_path_buf(),
                });
            }
            checkin_info!("loaded {} profiles from {:?}", profiles.len(), path);
            profiles
        }
    };

    let mut seen = BTreeSet::new();
    for profile in &profiles {
        if !seen.insert(profile.name.as_str()) {
            return Err(ConfigError::Duplicate(profile.name.clone()));
        }
        profile.validate()?;
    }
    Ok(profiles)
}

/// Keeps the named profiles in the order given; all of them when `names` is empty.
pub fn select_profiles(
    profiles: Vec<SiteProfile>,
    names: &[String],
) -> Result<Vec<SiteProfile>, ConfigError> {
    if names.is_empty() {
        return Ok(profiles);
    }
    names
        .iter()
        .map(|name| {
            profiles
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(name))
                .cloned()
                .ok_or_else(|| ConfigError::UnknownSite {
                    name: name.clone(),
                    available: profiles
                        .iter()
                        .map(|p| p.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                })
        })
        .collect()
}
