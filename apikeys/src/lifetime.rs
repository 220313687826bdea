use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt, Snafu, ensure};

use crate::dto::TokenConfigDto;

pub const NANOS_PER_DAY: i64 = 86_400 * 1_000_000_000;
pub const LIFETIME_PRESET_DAYS: [u32; 4] = [7, 30, 60, 90];
pub const DEFAULT_LIFETIME_DAYS: u32 = 30;
pub const CUSTOM_LIFETIME: &str = "custom";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Snafu)]
pub enum LifetimeError {
    #[snafu(display("Unknown lifetime option: {value}"))]
    UnknownOption { value: String },

    #[snafu(display("Expiration date is required"))]
    MissingDate,

    #[snafu(display("Invalid expiration date: {value}"))]
    InvalidDate {
        value: String,
        source: chrono::ParseError,
    },

    #[snafu(display("Expiration date must be in the future"))]
    PastDate,

    #[snafu(display("Lifetime must not exceed {max}"))]
    ExceedsMax { max: String },
}

/// Lifetime picked on the form, either a preset or a custom expiration date.
#[derive(Debug, Clone, PartialEq)]
pub enum LifetimeChoice {
    Days(u32),
    Custom(NaiveDate),
}

impl LifetimeChoice {
    pub fn parse(option: &str, expires_at: Option<&str>) -> Result<Self, LifetimeError> {
        let option = option.trim();
        if option == CUSTOM_LIFETIME {
            let value = expires_at
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .context(MissingDateSnafu)?;

            let date = NaiveDate::parse_from_str(value, DATE_FORMAT).context(InvalidDateSnafu {
                value: value.to_string(),
            })?;
            return Ok(LifetimeChoice::Custom(date));
        }

        match option.parse::<u32>() {
            Ok(days) if LIFETIME_PRESET_DAYS.contains(&days) => Ok(LifetimeChoice::Days(days)),
            _ => UnknownOptionSnafu { value: option }.fail(),
        }
    }

    /// Value of the selected option as posted by the form
    pub fn value(&self) -> String {
        match self {
            LifetimeChoice::Days(days) => days.to_string(),
            LifetimeChoice::Custom(_) => CUSTOM_LIFETIME.to_string(),
        }
    }

    pub fn custom_date(&self) -> Option<String> {
        match self {
            LifetimeChoice::Days(_) => None,
            LifetimeChoice::Custom(date) => Some(date.format(DATE_FORMAT).to_string()),
        }
    }

    /// Lifetime in nanoseconds counted from `now`
    pub fn to_nanos(&self, now: DateTime<Utc>) -> Result<i64, LifetimeError> {
        match self {
            LifetimeChoice::Days(days) => Ok(i64::from(*days) * NANOS_PER_DAY),
            LifetimeChoice::Custom(date) => {
                // Valid until the end of the chosen day
                let end = date
                    .and_time(NaiveTime::MIN)
                    .and_utc()
                    .checked_add_signed(TimeDelta::days(1))
                    .context(ExceedsMaxSnafu {
                        max: "the supported range",
                    })?;

                ensure!(end > now, PastDateSnafu);
                Ok((end - now).num_nanoseconds().unwrap_or(i64::MAX))
            }
        }
    }

    /// Resolves the lifetime and checks it against the deployment maximum
    pub fn resolve(&self, config: &TokenConfigDto, now: DateTime<Utc>) -> Result<i64, LifetimeError> {
        let nanos = self.to_nanos(now)?;
        ensure!(
            nanos <= config.max_token_lifetime,
            ExceedsMaxSnafu {
                max: format_days(config.max_token_lifetime),
            }
        );
        Ok(nanos)
    }

    pub fn expires_on(&self, now: DateTime<Utc>) -> NaiveDate {
        match self {
            LifetimeChoice::Days(days) => (now + TimeDelta::days(i64::from(*days))).date_naive(),
            LifetimeChoice::Custom(date) => *date,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LifetimeOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

pub fn allowed_presets(config: &TokenConfigDto) -> Vec<u32> {
    LIFETIME_PRESET_DAYS
        .iter()
        .copied()
        .filter(|days| i64::from(*days) * NANOS_PER_DAY <= config.max_token_lifetime)
        .collect()
}

pub fn default_choice(config: &TokenConfigDto, now: DateTime<Utc>) -> LifetimeChoice {
    let presets = allowed_presets(config);
    if presets.contains(&DEFAULT_LIFETIME_DAYS) {
        return LifetimeChoice::Days(DEFAULT_LIFETIME_DAYS);
    }

    if let Some(days) = presets.last() {
        return LifetimeChoice::Days(*days);
    }

    // Shorter than a week, default to tomorrow
    LifetimeChoice::Custom((now + TimeDelta::days(1)).date_naive())
}

pub fn lifetime_options(config: &TokenConfigDto, selected: &LifetimeChoice) -> Vec<LifetimeOption> {
    let current = selected.value();
    let mut options: Vec<LifetimeOption> = allowed_presets(config)
        .into_iter()
        .map(|days| {
            let value = days.to_string();
            LifetimeOption {
                label: format!("{} days", days),
                selected: value == current,
                value,
            }
        })
        .collect();

    options.push(LifetimeOption {
        value: CUSTOM_LIFETIME.to_string(),
        label: "Custom".to_string(),
        selected: current == CUSTOM_LIFETIME,
    });

    options
}

pub fn format_days(nanos: i64) -> String {
    let days = nanos / NANOS_PER_DAY;
    match days {
        1 => "1 day".to_string(),
        d => format!("{} days", d),
    }
}
