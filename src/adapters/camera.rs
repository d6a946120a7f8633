//! Camera adapter that logs the capture request.

use chrono::NaiveDateTime;
use log::info;

use crate::app::ports::{CameraPort, CameraSettings};
use crate::error::ActionError;

#[derive(Debug, Default)]
pub struct LogCamera {
    captures: u32,
}

impl LogCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn captures(&self) -> u32 {
        self.captures
    }
}

impl CameraPort for LogCamera {
    fn capture(&mut self, settings: &CameraSettings, now: NaiveDateTime) -> Result<(), ActionError> {
        let settings = serde_json::to_string(settings).map_err(|e| ActionError::Capture(e.to_string()))?;
        info!(
            "CAMERA | capture_{}.jpg | settings={}",
            now.format("%Y%m%d_%H%M%S"),
            settings
        );
        self.captures += 1;
        Ok(())
    }
}
