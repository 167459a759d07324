// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Tracing runtime control.

use std::fmt::Display;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use ordermap::OrderMap;
use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, Registry, prelude::*, reload};

use crate::LevelFilter;
use crate::targets::TRACING_TARGETS;
use crate::trace_target;

trace_target!("tracectl", LevelFilter::INFO, &[]);

/// Keys of a configuration string which do not name a tag.
const DEFAULT_KEY: &str = "default";
const ALL_KEY: &str = "all";

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum TraceCtlError {
    #[error("Invalid syntax '{0}': expected tag=level")]
    Syntax(String),
    #[error("Invalid level '{level}' for '{tag}'")]
    InvalidLevel { tag: String, level: String },
}

/// The configuration of one tracing target.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TargetCfg {
    pub target: &'static str,
    pub name: &'static str,
    pub level: LevelFilter,
    /// Always contains the target name.
    pub tags: Vec<&'static str>,
}

impl TargetCfg {
    fn new(
        target: &'static str,
        name: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
    ) -> Self {
        let mut tags = tags.to_vec();
        if !tags.contains(&name) {
            tags.push(name);
        }
        Self {
            target,
            name,
            level,
            tags,
        }
    }
    fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(&tag)
    }
}

impl Display for TargetCfg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:>40} │ {:>5} │ {}",
            self.target,
            self.level,
            self.tags.join(",")
        )
    }
}

#[derive(Debug)]
struct TargetDb {
    level: LevelFilter,
    targets: OrderMap<&'static str, TargetCfg>,
}

impl TargetDb {
    fn new(level: LevelFilter) -> Self {
        let mut targets = OrderMap::new();
        for decl in TRACING_TARGETS {
            let cfg = TargetCfg::new(decl.target, decl.name, decl.level, decl.tags);
            if targets.insert(decl.target, cfg).is_some() {
                warn!("Tracing target {} is defined more than once", decl.target);
            }
        }
        Self { level, targets }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::new(self.level.to_string());
        for target in self.targets.values() {
            match format!("{}={}", target.target, target.level).parse() {
                Ok(directive) => filter = filter.add_directive(directive),
                Err(e) => warn!("Skipping tracing target {}: {e}", target.target),
            }
        }
        filter
    }

    fn set_tag_level(&mut self, tag: &str, level: LevelFilter) -> usize {
        let mut changed = 0;
        for target in self.targets.values_mut().filter(|t| t.has_tag(tag)) {
            if target.level != level {
                target.level = level;
                changed += 1;
            }
        }
        changed
    }

    fn as_config_string(&self) -> String {
        let mut out = format!("{DEFAULT_KEY}={}", self.level);
        for target in self.targets.values() {
            out += &format!(",{}={}", target.name, target.level);
        }
        out
    }
}

impl Display for TargetDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{:>40} │ {:>5} │ TAGS", "TARGET", "LEVEL")?;
        for target in self.targets.values() {
            writeln!(f, "{target}")?;
        }
        write!(f, "{:>40} │ {:>5} │ --", "(default)", self.level)
    }
}

/// Owner of the tracing subscriber and of the per-target levels.
#[derive(Debug)]
pub struct TracingControl {
    db: Mutex<TargetDb>,
    reload_filter: reload::Handle<EnvFilter, Registry>,
}

impl TracingControl {
    fn new() -> Self {
        let db = TargetDb::new(LevelFilter::INFO);
        let (filter, reload_filter) = reload::Layer::new(db.env_filter());
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_line_number(true)
            .with_target(true)
            .with_thread_names(true)
            .with_level(true);
        if let Err(e) = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
        {
            // someone else owns the global subscriber; levels are still tracked
            debug!("Tracing subscriber not installed: {e}");
        }
        Self {
            db: Mutex::new(db),
            reload_filter,
        }
    }

    fn db(&self) -> MutexGuard<'_, TargetDb> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reload(&self, db: &TargetDb) {
        if let Err(e) = self.reload_filter.reload(db.env_filter()) {
            debug!("Failed to reload tracing filter: {e}");
        }
    }

    /// Install the subscriber, if not done yet.
    pub fn init() {
        get_trace_ctl();
    }

    /// Set the level of every target carrying `tag`. Returns the number of targets changed.
    pub fn set_tag_level(&self, tag: &str, level: LevelFilter) -> usize {
        let mut db = self.db();
        let changed = db.set_tag_level(tag, level);
        if changed > 0 {
            self.reload(&db);
        }
        info!("Changed log level for tag '{tag}' to {level}. Targets changed: {changed}");
        changed
    }

    pub fn set_level_all(&self, level: LevelFilter) {
        let mut db = self.db();
        for target in db.targets.values_mut() {
            target.level = level;
        }
        self.reload(&db);
    }

    pub fn set_default_level(&self, level: LevelFilter) {
        let mut db = self.db();
        if db.level != level {
            db.level = level;
            info!("Set default log level to {level}");
            self.reload(&db);
        }
    }

    #[must_use]
    pub fn default_level(&self) -> LevelFilter {
        self.db().level
    }

    /// Parse a comma-separated list of `tag=level` items.
    pub fn parse_config(input: &str) -> Result<OrderMap<String, LevelFilter>, TraceCtlError> {
        let mut config = OrderMap::new();
        for item in input.split(',').map(str::trim) {
            let Some((tag, level)) = item.split_once('=') else {
                return Err(TraceCtlError::Syntax(item.to_string()));
            };
            let (tag, level) = (tag.trim(), level.trim());
            let parsed =
                LevelFilter::from_str(level).map_err(|_| TraceCtlError::InvalidLevel {
                    tag: tag.to_string(),
                    level: level.to_string(),
                })?;
            config.insert(tag.to_string(), parsed);
        }
        Ok(config)
    }

    /// Apply a configuration string such as `default=warn,all=info,attach-mgmt=debug`.
    ///
    /// `default` sets the level of events outside any declared target, `all` sets every declared
    /// target, and any other key is a tag. Tags are applied after `all`. Nothing is applied if
    /// the string does not parse.
    pub fn setup_from_string(&self, input: &str) -> Result<(), TraceCtlError> {
        let config = Self::parse_config(input)?;
        if let Some(level) = config.get(DEFAULT_KEY) {
            self.set_default_level(*level);
        }
        if let Some(level) = config.get(ALL_KEY) {
            self.set_level_all(*level);
        }
        for (tag, level) in config
            .iter()
            .filter(|(tag, _)| *tag != DEFAULT_KEY && *tag != ALL_KEY)
        {
            if self.set_tag_level(tag, *level) == 0 && self.targets_by_tag(tag).is_empty() {
                warn!("No tracing target has tag '{tag}'");
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn target(&self, target: &str) -> Option<TargetCfg> {
        self.db().targets.get(target).cloned()
    }

    #[must_use]
    pub fn targets_by_tag(&self, tag: &str) -> Vec<TargetCfg> {
        self.db()
            .targets
            .values()
            .filter(|t| t.has_tag(tag))
            .cloned()
            .collect()
    }

    /// A configuration string which reproduces the current levels.
    #[must_use]
    pub fn as_config_string(&self) -> String {
        self.db().as_config_string()
    }

    pub fn dump(&self) {
        info!("{}", *self.db());
    }
}

static TRACING_CTL: OnceLock<TracingControl> = OnceLock::new();

/// Get the process-wide [`TracingControl`], initializing it on first use.
pub fn get_trace_ctl() -> &'static TracingControl {
    TRACING_CTL.get_or_init(TracingControl::new)
}
