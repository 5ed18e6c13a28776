//! Audio loading and writing backends for the trimmer
//!
//! The backend is picked once per run from [`TrimBackendKind`].

pub mod decoder;
pub mod traits;
pub mod wav;

pub use decoder::SymphoniaBackend;
pub use traits::TrimBackend;
pub use wav::HoundBackend;

use crate::config::TrimBackendKind;
use std::sync::Arc;

/// Build the backend selected in the settings
pub fn backend_for(kind: TrimBackendKind) -> Arc<dyn TrimBackend> {
    match kind {
        TrimBackendKind::Hound => Arc::new(HoundBackend::new()),
        TrimBackendKind::Symphonia => Arc::new(SymphoniaBackend::new()),
    }
}
