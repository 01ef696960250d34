pub mod config;
mod error;
pub mod logging;
mod portal;

// Flat re-exports: the public API surface
pub use config::{LogConfig, PaymentConfig, PortalConfig};
pub use error::{Error, ErrorKind, Result};
pub use logging::{LogFormat, init_logging};
pub use portal::{AdminPanel, LoadReport, Portal, PortalBuilder, UPCOMING_EVENTS};

pub use congregate_core::auth::{AdminAllowList, AuthContext, AuthProvider, MemoryAuth, User, is_admin};
pub use congregate_core::backend::{MemoryBackend, RestConnection, TableBackend};
pub use congregate_core::payment::{QrEncoder, QrOptions};
pub use congregate_core::records::{self, AnyRecord, RecordId, Table};
pub use congregate_core::settings::{Settings, SettingsPatch};
pub use congregate_core::sync::{SwallowFailure, TableHandle};
