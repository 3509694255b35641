//! Convenience re-exports.

pub use crate::config::{ConfigResolver, Credentials, EnvConfig, StaticConfig, StreamConfig};
pub use crate::locator::Locator;
pub use crate::mode::{ModeFlags, OpenMode};
pub use crate::stat::Stat;
pub use crate::store::{Container, Lookup, ObjectInfo, Session, SessionFactory, Visibility};
pub use crate::{Error, ObjectStream, Result, StoreError, StreamContext, StreamWrapper};
