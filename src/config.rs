//! Monitor configuration.
//!
//! Two layers:
//!
//! - `Raw*` structs mirror the configuration document one-to-one and are
//!   what serde deserializes (YAML, JSON or TOML via the `config` crate).
//! - [`MonitorConfig`] is the validated, typed form the service runs on.
//!
//! [`MonitorConfig::from_raw`] is the only way from one to the other and
//! fails on the first invalid rule: unknown metric or limit, malformed
//! time, unknown or missing weekday, zero interval.  A monitor that would
//! silently ignore a rule refuses to start instead.

use chrono::{NaiveTime, Weekday};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::app::ports::{CameraSettings, ConfigError};
use crate::evaluator::{BoundDirection, ThresholdFilter};
use crate::scheduler::{TimeWindow, WeekdaySet};
use crate::sensors::{Metric, SensorModel};

// ═══════════════════════════════════════════════════════════════
//  Raw document
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub sensor: RawSensorSection,
    pub mail: RawMailSection,
    pub module: RawModuleSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSensorSection {
    pub scheduler: RawPolling,
    pub bh1750fvi: RawToggle,
    pub sht31: RawToggle,
    pub co2mini: RawToggle,
    pub vl6180: RawToggle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPolling {
    pub interval_minutes: u32,
}

impl Default for RawPolling {
    fn default() -> Self {
        Self { interval_minutes: 10 }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawToggle {
    #[serde(rename = "use")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMailSection {
    pub to_address: String,
    pub alert: RawAlert,
    pub summary: RawSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RawAlert {
    #[serde(rename = "use")]
    pub enabled: bool,
    pub skip_interval_minutes: u32,
    pub subject: String,
    pub body: RawAlertBody,
    pub filters: Vec<RawFilter>,
}

impl Default for RawAlert {
    fn default() -> Self {
        Self {
            enabled: false,
            skip_interval_minutes: 60,
            subject: "Sensor alert".to_string(),
            body: RawAlertBody::default(),
            filters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RawAlertBody {
    pub upper: String,
    pub lower: String,
}

impl Default for RawAlertBody {
    fn default() -> Self {
        Self {
            upper: "{name} is above {threshold}{unit} (now {value}{unit})".to_string(),
            lower: "{name} is below {threshold}{unit} (now {value}{unit})".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSummary {
    #[serde(rename = "use")]
    pub enabled: bool,
    pub from_days: u32,
    pub subject: String,
    pub body: String,
    pub scheduler: RawSchedule,
}

impl Default for RawSummary {
    fn default() -> Self {
        Self {
            enabled: false,
            from_days: 7,
            subject: "Sensor summary".to_string(),
            body: "Readings of the last {from_days} days.".to_string(),
            scheduler: RawSchedule::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawModuleSection {
    pub relay_module: RawRelay,
    pub web_camera_module: RawCamera,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRelay {
    pub turn_on_minutes: u32,
    pub scheduler: RawSchedule,
    pub conditions: RawConditions,
}

impl Default for RawRelay {
    fn default() -> Self {
        Self {
            turn_on_minutes: 1,
            scheduler: RawSchedule::default(),
            conditions: RawConditions::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConditions {
    #[serde(rename = "use")]
    pub enabled: bool,
    pub skip_interval_minutes: u32,
    pub filters: Vec<RawFilter>,
}

impl Default for RawConditions {
    fn default() -> Self {
        Self {
            enabled: false,
            skip_interval_minutes: 60,
            filters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawCamera {
    #[serde(rename = "use")]
    pub enabled: bool,
    pub settings: CameraSettings,
    pub scheduler: RawSchedule,
}

/// Weekly schedule.  `use` is only meaningful for the relay schedule;
/// other schedules follow their module's own flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSchedule {
    #[serde(rename = "use")]
    pub enabled: Option<bool>,
    pub day_of_week: Vec<String>,
    pub at_time: AtTime,
}

/// `at_time` may be a single string or a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AtTime {
    One(String),
    Many(Vec<String>),
}

impl Default for AtTime {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl AtTime {
    fn entries(&self) -> &[String] {
        match self {
            Self::One(s) => core::slice::from_ref(s),
            Self::Many(v) => v,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFilter {
    pub name: String,
    pub limit: String,
    pub threshold: f64,
}

// ═══════════════════════════════════════════════════════════════
//  Validated configuration
// ═══════════════════════════════════════════════════════════════

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Polling period and scheduler granularity.
    pub interval_minutes: u32,
    /// Enabled sensor boards, in priority order.
    pub sensors: Vec<SensorModel>,
    pub mail: MailTemplates,
    pub alert: Option<AlertConfig>,
    pub summary: Option<SummaryConfig>,
    pub relay: Option<RelayConfig>,
    pub camera: Option<CameraConfig>,
}

/// Text the mail adapter renders messages from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailTemplates {
    pub to_address: String,
    pub alert_subject: String,
    pub alert_upper: String,
    pub alert_lower: String,
    pub summary_subject: String,
    pub summary_body: String,
}

#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub skip_interval_minutes: u32,
    pub filters: Vec<ThresholdFilter>,
}

#[derive(Debug, Clone)]
pub struct SummaryConfig {
    pub from_days: u32,
    pub window: TimeWindow,
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub turn_on_minutes: u32,
    /// Weekly activation, if `scheduler.use`.
    pub schedule: Option<TimeWindow>,
    /// Threshold activation, if `conditions.use`.
    pub conditions: Option<ConditionsConfig>,
}

#[derive(Debug, Clone)]
pub struct ConditionsConfig {
    pub skip_interval_minutes: u32,
    pub filters: Vec<ThresholdFilter>,
}

#[derive(Debug, Clone)]
pub struct CameraConfig {
    pub settings: CameraSettings,
    pub window: TimeWindow,
}

impl MailTemplates {
    fn from_raw(mail: &RawMailSection) -> Self {
        Self {
            to_address: mail.to_address.clone(),
            alert_subject: mail.alert.subject.clone(),
            alert_upper: mail.alert.body.upper.clone(),
            alert_lower: mail.alert.body.lower.clone(),
            summary_subject: mail.summary.subject.clone(),
            summary_body: mail.summary.body.clone(),
        }
    }
}

impl Default for MailTemplates {
    fn default() -> Self {
        Self::from_raw(&RawMailSection::default())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_minutes: RawPolling::default().interval_minutes,
            sensors: Vec::new(),
            mail: MailTemplates::default(),
            alert: None,
            summary: None,
            relay: None,
            camera: None,
        }
    }
}

impl MonitorConfig {
    /// Validate a raw document.
    pub fn from_raw(raw: &RawConfig) -> Result<Self, ConfigError> {
        let interval_minutes = raw.sensor.scheduler.interval_minutes;
        if interval_minutes == 0 {
            return Err(ConfigError::ZeroInterval("sensor.scheduler.interval_minutes"));
        }

        let toggles = [
            (SensorModel::Bh1750fvi, raw.sensor.bh1750fvi),
            (SensorModel::Sht31, raw.sensor.sht31),
            (SensorModel::Co2mini, raw.sensor.co2mini),
            (SensorModel::Vl6180, raw.sensor.vl6180),
        ];
        let sensors = toggles
            .iter()
            .filter(|(_, t)| t.enabled)
            .map(|(m, _)| *m)
            .collect();

        let mail_section = &raw.mail;
        let mail = MailTemplates::from_raw(mail_section);

        let alert = if mail_section.alert.enabled {
            Some(AlertConfig {
                skip_interval_minutes: mail_section.alert.skip_interval_minutes,
                filters: parse_filters("mail.alert", &mail_section.alert.filters)?,
            })
        } else {
            None
        };

        let summary = if mail_section.summary.enabled {
            if mail_section.summary.from_days == 0 {
                return Err(ConfigError::ZeroInterval("mail.summary.from_days"));
            }
            Some(SummaryConfig {
                from_days: mail_section.summary.from_days,
                window: parse_window("mail.summary.scheduler", &mail_section.summary.scheduler)?,
            })
        } else {
            None
        };

        let relay_raw = &raw.module.relay_module;
        let schedule = if relay_raw.scheduler.enabled.unwrap_or(false) {
            Some(parse_window("module.relay_module.scheduler", &relay_raw.scheduler)?)
        } else {
            None
        };
        let conditions = if relay_raw.conditions.enabled {
            Some(ConditionsConfig {
                skip_interval_minutes: relay_raw.conditions.skip_interval_minutes,
                filters: parse_filters("module.relay_module.conditions", &relay_raw.conditions.filters)?,
            })
        } else {
            None
        };
        let relay = if schedule.is_some() || conditions.is_some() {
            if relay_raw.turn_on_minutes == 0 {
                return Err(ConfigError::ZeroInterval("module.relay_module.turn_on_minutes"));
            }
            Some(RelayConfig {
                turn_on_minutes: relay_raw.turn_on_minutes,
                schedule,
                conditions,
            })
        } else {
            None
        };

        let camera_raw = &raw.module.web_camera_module;
        let camera = if camera_raw.enabled {
            Some(CameraConfig {
                settings: camera_raw.settings.clone(),
                window: parse_window("module.web_camera_module.scheduler", &camera_raw.scheduler)?,
            })
        } else {
            None
        };

        Ok(Self {
            interval_minutes,
            sensors,
            mail,
            alert,
            summary,
            relay,
            camera,
        })
    }

    /// Every metric some enabled filter refers to.
    pub fn filtered_metrics(&self) -> Vec<Metric> {
        let alert = self.alert.iter().flat_map(|a| a.filters.iter());
        let relay = self
            .relay
            .iter()
            .filter_map(|r| r.conditions.as_ref())
            .flat_map(|c| c.filters.iter());
        let mut metrics: Vec<Metric> = alert.chain(relay).map(|f| f.metric).collect();
        metrics.sort_unstable();
        metrics.dedup();
        metrics
    }
}

// ── Validation helpers ────────────────────────────────────────

fn parse_filters(section: &'static str, raw: &[RawFilter]) -> Result<Vec<ThresholdFilter>, ConfigError> {
    let mut filters: Vec<ThresholdFilter> = Vec::with_capacity(raw.len());
    for entry in raw {
        let metric: Metric = entry
            .name
            .parse()
            .map_err(|_| ConfigError::UnknownMetric(entry.name.clone()))?;
        let direction: BoundDirection = entry
            .limit
            .parse()
            .map_err(|_| ConfigError::UnknownLimit(entry.limit.clone()))?;
        if !entry.threshold.is_finite() {
            return Err(ConfigError::InvalidThreshold { metric, section });
        }
        if filters
            .iter()
            .any(|f| f.metric == metric && f.direction == direction)
        {
            warn!(
                "{}: more than one {} {} filter; each is evaluated independently",
                section, metric, direction
            );
        }
        filters.push(ThresholdFilter::new(metric, direction, entry.threshold));
    }
    Ok(filters)
}

fn parse_window(section: &'static str, raw: &RawSchedule) -> Result<TimeWindow, ConfigError> {
    let mut weekdays = WeekdaySet::EMPTY;
    for day in &raw.day_of_week {
        let parsed: Weekday = day.trim().parse().map_err(|_| ConfigError::UnknownWeekday {
            section,
            value: day.clone(),
        })?;
        weekdays.insert(parsed);
    }
    if weekdays.is_empty() {
        return Err(ConfigError::EmptyWeekdays(section));
    }

    let instants = raw
        .at_time
        .entries()
        .iter()
        .map(|s| parse_time(s).ok_or_else(|| ConfigError::MalformedTime { section, value: s.clone() }))
        .collect::<Result<Vec<_>, _>>()?;
    if instants.is_empty() {
        return Err(ConfigError::EmptyInstants(section));
    }

    Ok(TimeWindow::new(weekdays, instants))
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}
