// src/config/validate.rs

use std::collections::{BTreeSet, HashSet};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::ConfigError;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ConfigError;

    fn try_from(raw: RawConfigFile) -> Result<Self, Self::Error> {
        let roots = validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.workflow, raw.task, roots))
    }
}

/// Run every check and return the resolved root labels.
fn validate_raw_config(cfg: &RawConfigFile) -> Result<Vec<String>, ConfigError> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_task_types(cfg)?;
    validate_successors(cfg)?;
    let roots = resolve_roots(cfg)?;
    ensure_all_reachable(cfg, &roots)?;
    Ok(roots)
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<(), ConfigError> {
    if cfg.task.is_empty() {
        return Err(ConfigError::NoTasks);
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<(), ConfigError> {
    if cfg.config.timeout_secs == 0 {
        return Err(ConfigError::InvalidSetting {
            key: "timeout_secs",
            got: 0,
        });
    }
    if cfg.config.sink_capacity == 0 {
        return Err(ConfigError::InvalidSetting {
            key: "sink_capacity",
            got: 0,
        });
    }
    Ok(())
}

fn validate_task_types(cfg: &RawConfigFile) -> Result<(), ConfigError> {
    for (label, task) in &cfg.task {
        task.task_kind()
            .map_err(|reason| ConfigError::InvalidTaskType {
                task: label.clone(),
                reason,
            })?;
    }
    Ok(())
}

fn validate_successors(cfg: &RawConfigFile) -> Result<(), ConfigError> {
    for (label, task) in &cfg.task {
        if let Some(missing) = task.next.iter().find(|n| !cfg.task.contains_key(*n)) {
            return Err(ConfigError::UnknownSuccessor {
                task: label.clone(),
                reference: missing.clone(),
            });
        }
    }
    Ok(())
}

/// Explicit `[workflow].roots`, or every task nothing points at.
fn resolve_roots(cfg: &RawConfigFile) -> Result<Vec<String>, ConfigError> {
    if let Some(roots) = &cfg.workflow.roots {
        if let Some(missing) = roots.iter().find(|r| !cfg.task.contains_key(*r)) {
            return Err(ConfigError::UnknownRoot(missing.clone()));
        }
        if roots.is_empty() {
            return Err(ConfigError::NoRoots);
        }
        return Ok(roots.clone());
    }

    let has_parent: BTreeSet<&str> = cfg
        .task
        .values()
        .flat_map(|t| t.next.iter().map(String::as_str))
        .collect();
    let roots: Vec<String> = cfg
        .task
        .keys()
        .filter(|label| !has_parent.contains(label.as_str()))
        .cloned()
        .collect();
    if roots.is_empty() {
        return Err(ConfigError::NoRoots);
    }
    Ok(roots)
}

fn ensure_all_reachable(cfg: &RawConfigFile, roots: &[String]) -> Result<(), ConfigError> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = roots.iter().map(String::as_str).collect();
    while let Some(label) = stack.pop() {
        if !seen.insert(label) {
            continue;
        }
        if let Some(task) = cfg.task.get(label) {
            stack.extend(task.next.iter().map(String::as_str));
        }
    }

    match cfg.task.keys().find(|label| !seen.contains(label.as_str())) {
        Some(orphan) => Err(ConfigError::Unreachable(orphan.clone())),
        None => Ok(()),
    }
}
