//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements          | Connects to                   |
//! |---------------|---------------------|-------------------------------|
//! | `camera`      | CameraPort          | log output                    |
//! | `file_config` | ConfigPort          | YAML/JSON/TOML file + env     |
//! | `hardware`    | MailPort, RelayPort,| delegates to the three below  |
//! |               | CameraPort          |                               |
//! | `log_sink`    | EventSink           | log output                    |
//! | `mailer`      | MailPort            | template rendering + log      |
//! | `relay`       | RelayPort           | `embedded-hal` output pin     |
//! | `time`        | TimePort            | local wall clock              |
//!
//! Sensor channels live in [`crate::sensors`].

pub mod camera;
pub mod file_config;
pub mod hardware;
pub mod log_sink;
pub mod mailer;
pub mod relay;
pub mod time;
