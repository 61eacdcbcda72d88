//! Instance log for quest outcomes.
//!
//! Instances are appended to a JSONL (JSON Lines) file with file locking
//! so several processes can record outcomes safely. Reading builds a
//! per-template date index that the activity evaluator consumes.

use crate::activity::InstanceSource;
use crate::dates::CalendarDate;
use crate::{InstanceStatus, QuestInstance, Result};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Destination for recorded instances
pub trait InstanceSink {
    fn append(&mut self, instance: &QuestInstance) -> Result<()>;
}

/// JSONL-based instance log with file locking
pub struct InstanceLog {
    path: PathBuf,
}

impl InstanceLog {
    /// Create a new instance log for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl InstanceSink for InstanceLog {
    fn append(&mut self, instance: &QuestInstance) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(instance)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!(
            "Appended instance {} ({} on {}) to log",
            instance.id,
            instance.template_id,
            instance.date
        );
        Ok(())
    }
}

/// Read all instances from a log file.
///
/// A missing file is an empty log. Lines that fail to parse are logged and
/// skipped; IO failures are returned.
pub fn read_instances(path: &Path) -> Result<Vec<QuestInstance>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut instances = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<QuestInstance>(&line) {
            Ok(instance) => instances.push(instance),
            Err(e) => {
                tracing::warn!("Failed to parse instance at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} instances from {:?}", instances.len(), path);
    Ok(instances)
}

/// Date-indexed instance statuses for one template
#[derive(Clone, Debug, Default)]
pub struct InstanceIndex {
    by_date: HashMap<CalendarDate, InstanceStatus>,
}

impl InstanceIndex {
    /// Index `instances` for `template_id` within `[start, end]`.
    ///
    /// Later entries for the same date replace earlier ones.
    pub fn from_instances<'a, I>(
        instances: I,
        template_id: &str,
        start: CalendarDate,
        end: CalendarDate,
    ) -> Self
    where
        I: IntoIterator<Item = &'a QuestInstance>,
    {
        let by_date = instances
            .into_iter()
            .filter(|i| i.template_id == template_id && i.date >= start && i.date <= end)
            .map(|i| (i.date, i.status()))
            .collect();
        Self { by_date }
    }

    /// Load the log at `path` and index it for one template and range
    pub fn load(
        path: &Path,
        template_id: &str,
        start: CalendarDate,
        end: CalendarDate,
    ) -> Result<Self> {
        let instances = read_instances(path)?;
        let index = Self::from_instances(&instances, template_id, start, end);
        tracing::info!(
            "Indexed {} instance day(s) for {} between {} and {}",
            index.len(),
            template_id,
            start,
            end
        );
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.by_date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}

impl InstanceSource for InstanceIndex {
    fn instance_on(&self, date: CalendarDate) -> Result<Option<InstanceStatus>> {
        Ok(self.by_date.get(&date).copied())
    }
}
