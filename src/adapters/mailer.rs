//! Mail adapter.
//!
//! Renders alert and summary messages from the configured templates and
//! hands them to the log.  Placeholders:
//!
//! | Placeholder   | Replaced with                                 |
//! |---------------|-----------------------------------------------|
//! | `{name}`      | metric name, first letter upper-cased         |
//! | `{threshold}` | filter threshold as written in the config     |
//! | `{value}`     | reading rounded to one decimal                |
//! | `{unit}`      | metric unit (`C`, `%`, `ppm`, `lux`, `mm`)    |
//! | `{from_days}` | summary period (summary body only)            |

use log::info;

use crate::app::ports::{AlertMessage, MailPort};
use crate::config::MailTemplates;
use crate::error::ActionError;
use crate::evaluator::BoundDirection;

/// A rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Fill an alert template.
pub fn render_alert(template: &str, alert: &AlertMessage) -> String {
    template
        .replace("{name}", &alert.metric.display_name())
        .replace("{threshold}", &alert.threshold.to_string())
        .replace("{value}", &format!("{:.1}", alert.value))
        .replace("{unit}", alert.unit)
}

/// Fill a summary template.
pub fn render_summary(template: &str, period_days: u32) -> String {
    template.replace("{from_days}", &period_days.to_string())
}

/// [`MailPort`] that logs the rendered message instead of relaying it.
pub struct LogMailer {
    templates: MailTemplates,
    sent: u32,
}

impl LogMailer {
    pub fn new(templates: MailTemplates) -> Self {
        Self { templates, sent: 0 }
    }

    /// Messages "sent" so far.
    pub fn sent(&self) -> u32 {
        self.sent
    }

    pub fn alert_mail(&self, alert: &AlertMessage) -> Mail {
        let template = match alert.direction {
            BoundDirection::Upper => &self.templates.alert_upper,
            BoundDirection::Lower => &self.templates.alert_lower,
        };
        Mail {
            to: self.templates.to_address.clone(),
            subject: render_alert(&self.templates.alert_subject, alert),
            body: render_alert(template, alert),
        }
    }

    pub fn summary_mail(&self, period_days: u32) -> Mail {
        Mail {
            to: self.templates.to_address.clone(),
            subject: render_summary(&self.templates.summary_subject, period_days),
            body: render_summary(&self.templates.summary_body, period_days),
        }
    }

    fn deliver(&mut self, mail: Mail) -> Result<(), ActionError> {
        if mail.to.trim().is_empty() {
            return Err(ActionError::Delivery("no recipient configured".into()));
        }
        info!("MAIL | to={} | {} | {}", mail.to, mail.subject, mail.body);
        self.sent += 1;
        Ok(())
    }
}

impl MailPort for LogMailer {
    fn send_alert(&mut self, alert: &AlertMessage) -> Result<(), ActionError> {
        let mail = self.alert_mail(alert);
        self.deliver(mail)
    }

    fn send_summary(&mut self, period_days: u32) -> Result<(), ActionError> {
        let mail = self.summary_mail(period_days);
        self.deliver(mail)
    }
}
