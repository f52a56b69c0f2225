use crate::error::TelemetryError;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static TIME_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{1,2})([smhd])$").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
}

impl TimeUnit {
    fn suffix(self) -> char {
        match self {
            TimeUnit::Second => 's',
            TimeUnit::Minute => 'm',
            TimeUnit::Hour => 'h',
            TimeUnit::Day => 'd',
        }
    }

    fn sql_name(self) -> &'static str {
        match self {
            TimeUnit::Second => "seconds",
            TimeUnit::Minute => "minutes",
            TimeUnit::Hour => "hours",
            TimeUnit::Day => "days",
        }
    }

    fn seconds(self) -> i64 {
        match self {
            TimeUnit::Second => 1,
            TimeUnit::Minute => 60,
            TimeUnit::Hour => 3600,
            TimeUnit::Day => 86_400,
        }
    }
}

/// A short duration such as `30m` or `15s`: one or two digits and a unit.
///
/// This is the only form in which caller-supplied ranges and intervals reach
/// query construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeToken {
    amount: u8,
    unit: TimeUnit,
}

impl TimeToken {
    pub fn new(amount: u8, unit: TimeUnit) -> Option<Self> {
        (amount < 100).then_some(Self { amount, unit })
    }

    pub fn amount(&self) -> u8 {
        self.amount
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.amount) * self.unit.seconds())
    }

    /// Postgres interval literal, e.g. `INTERVAL '30 minutes'`.
    pub fn sql_interval(&self) -> String {
        format!("INTERVAL '{} {}'", self.amount, self.unit.sql_name())
    }
}

impl FromStr for TimeToken {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = TIME_TOKEN
            .captures(s)
            .ok_or_else(|| TelemetryError::InvalidTimeToken(s.to_string()))?;
        let amount: u8 = caps[1]
            .parse()
            .map_err(|_| TelemetryError::InvalidTimeToken(s.to_string()))?;
        let unit = match &caps[2] {
            "s" => TimeUnit::Second,
            "m" => TimeUnit::Minute,
            "h" => TimeUnit::Hour,
            "d" => TimeUnit::Day,
            _ => return Err(TelemetryError::InvalidTimeToken(s.to_string())),
        };
        Ok(Self { amount, unit })
    }
}

impl fmt::Display for TimeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.suffix())
    }
}
