use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info};

use super::{FontChoice, FontFace, resolve_font};
use crate::error::LabelError;
use crate::settings::{FontSettings, Settings};

/// Lazily loads fonts and shares them between requests.
///
/// Each choice has its own slot. A font is parsed at most once: the first
/// loader holds the slot's load guard while readers of other, already loaded
/// fonts keep going. Failed loads are not remembered.
pub struct FontRegistry {
    slots: HashMap<FontChoice, FontSlot>,
}

struct FontSlot {
    source: FontSettings,
    face: RwLock<Option<Arc<FontFace>>>,
    loading: Mutex<()>,
}

impl FontSlot {
    fn cached(&self) -> Option<Arc<FontFace>> {
        self.face
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl FontRegistry {
    pub fn new(settings: &Settings) -> Self {
        let slots = [FontChoice::Default, FontChoice::Sans, FontChoice::Serif]
            .into_iter()
            .map(|choice| {
                let slot = FontSlot {
                    source: settings.font(choice).clone(),
                    face: RwLock::new(None),
                    loading: Mutex::new(()),
                };
                (choice, slot)
            })
            .collect();
        Self { slots }
    }

    pub fn source(&self, choice: FontChoice) -> Option<&FontSettings> {
        self.slots.get(&choice).map(|slot| &slot.source)
    }

    pub fn get(&self, choice: FontChoice) -> Result<Arc<FontFace>, LabelError> {
        let slot = self
            .slots
            .get(&choice)
            .ok_or_else(|| LabelError::FontLoad(format!("no font configured for {:?}", choice)))?;
        if let Some(face) = slot.cached() {
            return Ok(face);
        }

        let _guard = slot.loading.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(face) = slot.cached() {
            return Ok(face);
        }
        let source = &slot.source;
        debug!("loading font {:?} (path={:?}, family={:?})", choice, source.path, source.family);
        let face = Arc::new(resolve_font(
            source.path.as_deref().map(Path::new),
            source.family.as_deref(),
            source.size,
        )?);
        info!(
            "font loaded: {:?} -> {}",
            choice,
            face.family().unwrap_or("unknown family")
        );
        *slot.face.write().unwrap_or_else(PoisonError::into_inner) = Some(face.clone());
        Ok(face)
    }

    #[cfg(test)]
    fn is_loaded(&self, choice: FontChoice) -> bool {
        self.slots
            .get(&choice)
            .is_some_and(|slot| slot.cached().is_some())
    }
}
