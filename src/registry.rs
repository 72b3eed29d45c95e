//! # Template Registry
//!
//! File-backed CRUD storage for frame templates. Each template is a PNG
//! under `<data_dir>/uploads/` plus a record in `<data_dir>/index.json`
//! holding name, layout type, slot configuration, natural dimensions, and
//! creation time. The index is rewritten atomically (temp file + rename)
//! after every mutation; operations are single-step and safely re-triable.
//!
//! Uploads are validated before anything touches disk: only PNG data is
//! accepted, and the image is decoded up front so the natural dimensions
//! are known and stored slots can be clamped against them.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PhotoboxError;
use crate::geometry::SlotConfig;

/// PNG file signature.
pub(crate) const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Collage layout discriminator. Stored and echoed, but capture logic only
/// ever consults the primary slot; strip/grid layouts are unimplemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutType {
    #[default]
    Single,
    #[serde(rename = "strip_3")]
    Strip3,
    #[serde(rename = "grid_4")]
    Grid4,
}

impl std::str::FromStr for LayoutType {
    type Err = PhotoboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(Self::Single),
            "strip_3" => Ok(Self::Strip3),
            "grid_4" => Ok(Self::Grid4),
            other => Err(PhotoboxError::Validation(format!(
                "Unknown layout type '{}'",
                other
            ))),
        }
    }
}

/// A stored frame template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: u64,
    pub name: String,
    /// Relative path of the backing image, e.g. `uploads/<uuid>.png`.
    pub image_path: String,
    pub layout_type: LayoutType,
    pub config: SlotConfig,
    /// Natural pixel dimensions of the backing image, decoded at upload.
    pub width: u32,
    pub height: u32,
    pub created_at: DateTime<Utc>,
}

/// Fields of an update; `None` keeps the current value.
#[derive(Debug, Default)]
pub struct TemplateUpdate {
    pub name: Option<String>,
    pub layout_type: Option<LayoutType>,
    pub config: Option<SlotConfig>,
    /// Replacement image; the old file is deleted.
    pub image_bytes: Option<Vec<u8>>,
}

/// On-disk index layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Index {
    next_id: u64,
    templates: Vec<Template>,
}

/// The registry: owns the data directory and the template index.
pub struct TemplateStore {
    data_dir: PathBuf,
    index: Index,
}

impl TemplateStore {
    /// Open (or initialize) a registry rooted at `data_dir`.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, PhotoboxError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(data_dir.join("uploads"))?;

        let index_path = data_dir.join("index.json");
        let index = if index_path.exists() {
            let text = fs::read_to_string(&index_path)?;
            serde_json::from_str(&text).map_err(|e| {
                PhotoboxError::Validation(format!("Corrupt template index: {}", e))
            })?
        } else {
            Index { next_id: 1, templates: Vec::new() }
        };

        Ok(Self { data_dir, index })
    }

    /// All templates, newest first.
    #[must_use]
    pub fn list(&self) -> Vec<&Template> {
        let mut templates: Vec<&Template> = self.index.templates.iter().collect();
        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        templates
    }

    /// Look up a template by id.
    pub fn get(&self, id: u64) -> Result<&Template, PhotoboxError> {
        self.index
            .templates
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| PhotoboxError::NotFound(format!("Template {} not found", id)))
    }

    /// Absolute path of a template's backing image.
    #[must_use]
    pub fn image_disk_path(&self, template: &Template) -> PathBuf {
        self.data_dir.join(&template.image_path)
    }

    /// Create a template from an uploaded PNG.
    ///
    /// The upload is rejected (nothing persisted) unless the bytes are PNG
    /// and decode cleanly. Slots are clamped to the decoded dimensions.
    pub fn create(
        &mut self,
        name: &str,
        layout_type: LayoutType,
        config: SlotConfig,
        png_bytes: &[u8],
    ) -> Result<&Template, PhotoboxError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PhotoboxError::Validation("Name is required".to_string()));
        }
        let (width, height) = probe_png(png_bytes)?;

        let image_path = format!("uploads/{}.png", Uuid::new_v4());
        fs::write(self.data_dir.join(&image_path), png_bytes)?;

        let id = self.index.next_id;
        self.index.next_id += 1;
        self.index.templates.push(Template {
            id,
            name: name.to_string(),
            image_path,
            layout_type,
            config: config.clamped(width, height),
            width,
            height,
            created_at: Utc::now(),
        });
        self.persist()?;

        tracing::info!(id, name, "template created");
        self.get(id)
    }

    /// Update a template in place. A replacement image deletes the old
    /// file; omitted fields keep their current values.
    pub fn update(&mut self, id: u64, update: TemplateUpdate) -> Result<&Template, PhotoboxError> {
        // Validate the replacement image before mutating anything.
        let replacement = match &update.image_bytes {
            Some(bytes) => Some(probe_png(bytes)?),
            None => None,
        };

        let data_dir = self.data_dir.clone();
        let template = self
            .index
            .templates
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| PhotoboxError::NotFound(format!("Template {} not found", id)))?;

        if let (Some((width, height)), Some(bytes)) = (replacement, update.image_bytes.as_deref()) {
            let new_path = format!("uploads/{}.png", Uuid::new_v4());
            fs::write(data_dir.join(&new_path), bytes)?;

            let old_path = data_dir.join(&template.image_path);
            if old_path.exists() {
                fs::remove_file(old_path)?;
            }
            template.image_path = new_path;
            template.width = width;
            template.height = height;
        }
        if let Some(name) = update.name {
            let name = name.trim().to_string();
            if !name.is_empty() {
                template.name = name;
            }
        }
        if let Some(layout_type) = update.layout_type {
            template.layout_type = layout_type;
        }
        if let Some(config) = update.config {
            template.config = config;
        }
        // Re-clamp against whatever dimensions are now current.
        template.config = template.config.clamped(template.width, template.height);

        self.persist()?;
        tracing::info!(id, "template updated");
        self.get(id)
    }

    /// Delete a template record and its backing image file.
    pub fn delete(&mut self, id: u64) -> Result<(), PhotoboxError> {
        let pos = self
            .index
            .templates
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| PhotoboxError::NotFound(format!("Template {} not found", id)))?;

        let template = self.index.templates.remove(pos);
        self.persist()?;

        let image_path = self.data_dir.join(&template.image_path);
        if image_path.exists() {
            fs::remove_file(image_path)?;
        }
        tracing::info!(id, "template deleted");
        Ok(())
    }

    /// Rewrite the index atomically.
    fn persist(&self) -> Result<(), PhotoboxError> {
        let text = serde_json::to_string_pretty(&self.index)
            .map_err(|e| PhotoboxError::Validation(format!("Failed to serialize index: {}", e)))?;
        let tmp = self.data_dir.join("index.json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, self.data_dir.join("index.json"))?;
        Ok(())
    }
}

/// Check the PNG signature and decode the natural dimensions.
fn probe_png(bytes: &[u8]) -> Result<(u32, u32), PhotoboxError> {
    if bytes.len() < PNG_MAGIC.len() || bytes[..PNG_MAGIC.len()] != PNG_MAGIC {
        return Err(PhotoboxError::Validation(
            "Only PNG files are allowed".to_string(),
        ));
    }
    let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
        .map_err(|e| PhotoboxError::Validation(format!("Invalid PNG upload: {}", e)))?;
    Ok((img.width(), img.height()))
}
