use std::sync::Arc;
use crate::core::{KeyValueStore, Result, UploadTaskSettings};

const SETTINGS_KEY: &str = "uploadTaskSettings";

/// Last-used upload settings, kept for form pre-fill
#[derive(Clone)]
pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn save(&self, settings: &UploadTaskSettings) -> Result<()> {
        let serialized = serde_json::to_string(settings)?;
        self.store.set(SETTINGS_KEY, &serialized)
    }

    /// Overwrite the stored blob with the defaults
    pub fn reset(&self) -> Result<UploadTaskSettings> {
        let defaults = UploadTaskSettings::default();
        self.save(&defaults)?;
        Ok(defaults)
    }

    /// Saved settings, or the defaults when nothing usable is stored
    pub fn restore_last(&self) -> UploadTaskSettings {
        let raw = match self.store.get(SETTINGS_KEY) {
            Ok(Some(raw)) if !raw.trim().is_empty() => raw,
            Ok(_) => return UploadTaskSettings::default(),
            Err(err) => {
                tracing::debug!(error = %err, "Settings unavailable, using defaults");
                return UploadTaskSettings::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|err| {
            tracing::debug!(error = %err, "Stored settings unreadable, using defaults");
            UploadTaskSettings::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MemoryStore, OutputFormat};

    fn settings_store() -> (SettingsStore, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (SettingsStore::new(store.clone()), store)
    }

    #[test]
    fn test_first_run_returns_defaults() {
        let (settings, _) = settings_store();
        let restored = settings.restore_last();

        assert!(restored.ocr_enable);
        assert_eq!(restored.output_format, OutputFormat::Json);
        assert_eq!(restored.convert_to_pdf_timeout_sec, 900);
        assert_eq!(restored.pdf_to_images_timeout_sec, 900);
    }

    #[test]
    fn test_save_then_restore() {
        let (settings, _) = settings_store();
        let saved = UploadTaskSettings {
            language: Some("fr".to_string()),
            ocr_enable: false,
            output_format: OutputFormat::Msgpack,
            convert_to_pdf_timeout_sec: 120,
            pdf_to_images_timeout_sec: 0,
        };

        settings.save(&saved).unwrap();
        assert_eq!(settings.restore_last(), saved);

        // Last write wins
        let newer = UploadTaskSettings::default();
        settings.save(&newer).unwrap();
        assert_eq!(settings.restore_last(), newer);
    }

    #[test]
    fn test_unparsable_blob_falls_back_to_defaults() {
        let (settings, store) = settings_store();
        store.set("uploadTaskSettings", "{\"ocr_enable\": \"maybe\"").unwrap();

        assert_eq!(settings.restore_last(), UploadTaskSettings::default());
    }

    #[test]
    fn test_partial_blob_keeps_known_fields() {
        let (settings, store) = settings_store();
        store.set("uploadTaskSettings", "{\"ocr_enable\": false}").unwrap();

        let restored = settings.restore_last();
        assert!(!restored.ocr_enable);
        assert_eq!(restored.convert_to_pdf_timeout_sec, 900);
    }

    #[test]
    fn test_reset_overwrites_saved() {
        let (settings, _) = settings_store();
        settings.save(&UploadTaskSettings {
            ocr_enable: false,
            ..Default::default()
        }).unwrap();

        assert_eq!(settings.reset().unwrap(), UploadTaskSettings::default());
        assert!(settings.restore_last().ocr_enable);
    }
}
