// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{ConfigFile, MAX_DELAY_MS, MAX_STEP_INCREMENT_MS, RawConfigFile};
use crate::errors::{RascalError, Result};
use crate::model::action::target_device_of;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = RascalError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_routines(cfg)?;
    validate_scheduler_section(cfg)?;
    let devices = validate_devices(cfg)?;
    validate_routine_targets(cfg, &devices)?;
    Ok(())
}

fn ensure_has_routines(cfg: &RawConfigFile) -> Result<()> {
    if cfg.routine.is_empty() {
        return Err(RascalError::ConfigError(
            "config must contain at least one [routine.<id>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_scheduler_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.scheduler.step_increment_ms == 0 {
        return Err(RascalError::ConfigError(
            "[scheduler].step_increment_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.scheduler.step_increment_ms > MAX_STEP_INCREMENT_MS {
        return Err(RascalError::ConfigError(format!(
            "[scheduler].step_increment_ms must be <= {MAX_STEP_INCREMENT_MS} (got {})",
            cfg.scheduler.step_increment_ms
        )));
    }
    Ok(())
}

fn validate_devices(cfg: &RawConfigFile) -> Result<HashSet<&str>> {
    let mut seen = HashSet::new();
    for device in &cfg.devices {
        if device.trim().is_empty() {
            return Err(RascalError::ConfigError(
                "device ids must not be empty".to_string(),
            ));
        }
        if !seen.insert(device.as_str()) {
            return Err(RascalError::ConfigError(format!(
                "device '{device}' is listed more than once"
            )));
        }
    }
    Ok(seen)
}

fn validate_routine_targets(cfg: &RawConfigFile, devices: &HashSet<&str>) -> Result<()> {
    for (id, routine) in cfg.routine.iter() {
        if routine.actions.is_empty() {
            return Err(RascalError::ConfigError(format!(
                "routine '{id}' has no actions"
            )));
        }
        if routine.delay_ms > MAX_DELAY_MS {
            return Err(RascalError::ConfigError(format!(
                "routine '{id}' delay_ms must be <= {MAX_DELAY_MS} (got {})",
                routine.delay_ms
            )));
        }

        for (step, action) in routine.actions.iter().enumerate() {
            let Some(target) = target_device_of(action) else {
                return Err(RascalError::MissingTarget {
                    routine: id.clone(),
                    step,
                });
            };
            if !devices.contains(target.as_str()) {
                return Err(RascalError::ConfigError(format!(
                    "routine '{id}' step {step} targets unknown device '{target}'"
                )));
            }
        }
    }
    Ok(())
}
