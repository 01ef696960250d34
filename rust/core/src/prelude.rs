#![allow(unused_imports)]

pub use async_trait::async_trait;
pub use congregate_utils as utils;
pub use congregate_utils::error::{ContextExt, Error, ErrorKind, IntoInternal, Result};
pub use congregate_utils::{client_bail, client_error, internal_bail, internal_error};
pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
pub use serde_json::Value as Row;
pub use std::sync::{Arc, Mutex, RwLock};

pub use tracing::{debug, error, info, instrument, trace, warn};
