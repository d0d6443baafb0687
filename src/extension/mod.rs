//! Extension identity: identifiers, platforms and the keys derived from them.
//!
//! - [`identifier`] - validated [`ExtensionId`] and identifier-list parsing
//! - [`platform`] - [`PlatformDescriptor`] and the composite [`FetchKey`]

pub mod identifier;
pub mod platform;

pub use identifier::{parse_id_list, ExtensionId};
pub use platform::{Arch, FetchKey, Os, PlatformDescriptor};
