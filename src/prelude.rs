//! Everything an application needs to declare and bind persistable objects.

pub use crate::binding::{BindingContext, DataBinding, Schema, VersionTable};
pub use crate::config::{DataServiceConfig, HostEnvironment};
pub use crate::core::{BindError, RecordValue, Result, Table};
pub use crate::lifecycle::{CtrlCLifecycle, ManualLifecycle};
pub use crate::service::DataService;
pub use crate::shared;
pub use crate::store::{FileBackend, MemoryBackend};
