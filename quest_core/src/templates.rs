//! Template book persistence with file locking.
//!
//! Templates live in a single JSON document that is replaced atomically on
//! every save. Read-modify-write cycles are serialized through a sibling
//! `.lock` file.

use crate::{Error, QuestTemplate, Result, TemplateBook};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// `templates.json` -> `templates.json.lock`
fn lock_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    path.with_file_name(name)
}

impl TemplateBook {
    /// Load the template book with shared locking
    ///
    /// Returns an empty book if the file doesn't exist. A file that cannot
    /// be read or parsed is an error; the file is left untouched.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No template file found, starting with an empty book");
            return Ok(Self::default());
        }

        let file = File::open(path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        match serde_json::from_str::<TemplateBook>(&contents) {
            Ok(book) => {
                tracing::debug!("Loaded {} templates from {:?}", book.templates.len(), path);
                Ok(book)
            }
            Err(e) => {
                tracing::warn!("Failed to parse template file {:?}: {}", path, e);
                Err(Error::Json(e))
            }
        }
    }

    /// Save the book with exclusive locking
    ///
    /// Writes to a temp file in the same directory, syncs it, then renames
    /// it over the original.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temp = NamedTempFile::new_in(path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "template path missing parent")
        })?)?;

        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved {} templates to {:?}", self.templates.len(), path);
        Ok(())
    }

    /// Load the book, modify it, and save it back
    ///
    /// The whole cycle holds an exclusive lock on `<path>.lock`, so
    /// concurrent updates are applied one after another. Nothing is written
    /// if loading or `f` fails.
    pub fn update<F>(path: &Path, f: F) -> Result<Self>
    where
        F: FnOnce(&mut TemplateBook) -> Result<()>,
    {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(lock_path(path))?;
        lock.lock_exclusive()?;

        let result = Self::load(path).and_then(|mut book| {
            f(&mut book)?;
            book.save(path)?;
            Ok(book)
        });

        lock.unlock()?;
        result
    }

    /// Insert or replace a template
    pub fn upsert(&mut self, template: QuestTemplate) {
        tracing::info!("Storing template {}", template.id);
        self.templates.insert(template.id.clone(), template);
    }

    /// Mark a template inactive; it stays listed but accepts no new outcomes
    pub fn archive(&mut self, id: &str) -> Result<()> {
        let template = self
            .templates
            .get_mut(id)
            .ok_or_else(|| Error::UnknownTemplate(id.to_string()))?;
        template.is_active = false;
        tracing::info!("Archived template {}", id);
        Ok(())
    }

    /// Look up a template by id
    pub fn get(&self, id: &str) -> Result<&QuestTemplate> {
        self.templates
            .get(id)
            .ok_or_else(|| Error::UnknownTemplate(id.to_string()))
    }

    /// Templates sorted by id for stable listings
    pub fn sorted(&self) -> Vec<&QuestTemplate> {
        let mut templates: Vec<_> = self.templates.values().collect();
        templates.sort_by(|a, b| a.id.cmp(&b.id));
        templates
    }
}
