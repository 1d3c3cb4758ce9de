use std::path::{Path, PathBuf};
use std::sync::Arc;

use leptess::LepTess;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::OcrConfig;
use crate::error::{LectorError, Result};

/// Text recognized from a cleaned image, tagged with the language code
/// the engine ran with.
#[derive(Debug, Clone)]
pub struct Recognition {
    pub text: String,
    pub language: String,
}

enum OcrBackend {
    Local { tesseract: Arc<Mutex<LepTess>> },
    Unavailable { reason: String },
}

/// Adapter over the Tesseract engine.
///
/// Initialization degrades gracefully: if the engine or the configured
/// language pack is missing, the provider stays constructible and every
/// recognition attempt reports the engine as unavailable instead of
/// failing startup.
pub struct OcrProvider {
    backend: OcrBackend,
    language: String,
}

fn create_tesseract(datapath: Option<&str>, language: &str) -> std::result::Result<LepTess, String> {
    LepTess::new(datapath, language).map_err(|e| e.to_string())
}

impl OcrProvider {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let backend = match create_tesseract(config.tessdata_path.as_deref(), &config.language) {
            Ok(lt) => {
                info!(language = %config.language, "Tesseract OCR initialized");
                OcrBackend::Local {
                    tesseract: Arc::new(Mutex::new(lt)),
                }
            }
            Err(e) => {
                let reason = format!("Tesseract not available: {e}");
                warn!("{}", reason);
                OcrBackend::Unavailable { reason }
            }
        };

        Ok(Self {
            backend,
            language: config.language.clone(),
        })
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, OcrBackend::Unavailable { .. })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Recognize text from the processed image staged at `image_path`.
    ///
    /// The returned text is whitespace-trimmed and may be empty when the
    /// engine finds no characters. There is no timeout and no retry: a
    /// failure is terminal for the request, and a hung engine call
    /// blocks this worker until it returns.
    pub async fn recognize(&self, image_path: &Path) -> Result<Recognition> {
        match &self.backend {
            OcrBackend::Local { tesseract } => {
                let path: PathBuf = image_path.to_path_buf();
                let tesseract = Arc::clone(tesseract);

                let text = tokio::task::spawn_blocking(move || {
                    let mut lt = tesseract.blocking_lock();
                    lt.set_image(&path)
                        .map_err(|e| LectorError::Ocr(format!("Failed to set image: {e}")))?;
                    lt.get_utf8_text()
                        .map_err(|e| LectorError::Ocr(format!("Failed to extract text: {e}")))
                })
                .await
                .map_err(|e| LectorError::Internal(format!("OCR task panicked: {e}")))??;

                Ok(Recognition {
                    text: text.trim().to_string(),
                    language: self.language.clone(),
                })
            }
            OcrBackend::Unavailable { reason } => {
                Err(LectorError::OcrUnavailable(reason.clone()))
            }
        }
    }
}

impl Clone for OcrProvider {
    fn clone(&self) -> Self {
        match &self.backend {
            OcrBackend::Local { tesseract } => Self {
                backend: OcrBackend::Local {
                    tesseract: Arc::clone(tesseract),
                },
                language: self.language.clone(),
            },
            OcrBackend::Unavailable { reason } => Self {
                backend: OcrBackend::Unavailable {
                    reason: reason.clone(),
                },
                language: self.language.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(language: &str) -> OcrConfig {
        OcrConfig {
            language: language.to_string(),
            tessdata_path: None,
        }
    }

    #[test]
    fn provider_construction_degrades_gracefully() {
        // Succeeds whether or not Tesseract is installed on this host.
        let result = OcrProvider::new(&make_config("spa"));
        assert!(result.is_ok());
    }

    #[test]
    fn bogus_language_is_unavailable_not_fatal() {
        let provider = OcrProvider::new(&make_config("definitely-not-a-language")).unwrap();
        assert!(!provider.is_available());
    }

    #[tokio::test]
    async fn unavailable_backend_reports_unavailable() {
        let provider = OcrProvider {
            backend: OcrBackend::Unavailable {
                reason: "test".to_string(),
            },
            language: "spa".to_string(),
        };

        let result = provider.recognize(Path::new("/nonexistent.png")).await;
        assert!(matches!(result, Err(LectorError::OcrUnavailable(_))));
    }

    #[test]
    fn clone_preserves_availability() {
        let provider = OcrProvider::new(&make_config("definitely-not-a-language")).unwrap();
        let cloned = provider.clone();
        assert_eq!(provider.is_available(), cloned.is_available());
        assert_eq!(cloned.language(), "definitely-not-a-language");
    }
}
