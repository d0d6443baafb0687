//! Platform descriptors and fetch keys.

use super::identifier::ExtensionId;

use std::fmt;

/// Operating system a package is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Win,
    Mac,
    Linux,
    Cros,
    OpenBsd,
    Android,
}

impl Os {
    /// Token used by the update service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Win => "win",
            Os::Mac => "mac",
            Os::Linux => "linux",
            Os::Cros => "cros",
            Os::OpenBsd => "openbsd",
            Os::Android => "android",
        }
    }
}

/// CPU architecture a package is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86,
    X86_64,
    Arm,
    Arm64,
}

impl Arch {
    /// Token used by the update service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X86 => "x86-32",
            Arch::X86_64 => "x86-64",
            Arch::Arm => "arm",
            Arch::Arm64 => "arm64",
        }
    }
}

/// The platform a package is fetched for.
///
/// Only used to form the [`FetchKey`]; turning it into a request URL is left
/// to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlatformDescriptor {
    pub os: Os,
    pub arch: Arch,
    pub prod_version: String,
}

impl PlatformDescriptor {
    /// Product version reported when none is given.
    pub const DEFAULT_PROD_VERSION: &'static str = "120.0.0.0";

    /// Creates a new [`PlatformDescriptor`].
    pub fn new(os: Os, arch: Arch, prod_version: impl Into<String>) -> Self {
        Self {
            os,
            arch,
            prod_version: prod_version.into(),
        }
    }
}

impl Default for PlatformDescriptor {
    fn default() -> Self {
        Self::new(Os::Linux, Arch::X86_64, Self::DEFAULT_PROD_VERSION)
    }
}

impl fmt::Display for PlatformDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.os.as_str(),
            self.arch.as_str(),
            self.prod_version
        )
    }
}

/// Cache and deduplication key: identifier plus platform.
///
/// Two jobs with equal keys never cause two concurrent network fetches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchKey {
    id: ExtensionId,
    platform: PlatformDescriptor,
}

impl FetchKey {
    pub fn new(id: ExtensionId, platform: PlatformDescriptor) -> Self {
        Self { id, platform }
    }

    pub fn id(&self) -> &ExtensionId {
        &self.id
    }

    pub fn platform(&self) -> &PlatformDescriptor {
        &self.platform
    }
}

impl fmt::Display for FetchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> ExtensionId {
        "gppongmhjkpfnbhagpmjfkannfbllamg".parse().unwrap()
    }

    #[test]
    fn test_key_is_deterministic() {
        let a = FetchKey::new(id(), PlatformDescriptor::default());
        let b = FetchKey::new(id(), PlatformDescriptor::default());
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "gppongmhjkpfnbhagpmjfkannfbllamg@linux/x86-64/120.0.0.0");
    }

    #[test]
    fn test_platform_distinguishes_keys() {
        let a = FetchKey::new(id(), PlatformDescriptor::default());
        let b = FetchKey::new(id(), PlatformDescriptor::new(Os::Win, Arch::X86_64, "120.0.0.0"));
        let c = FetchKey::new(id(), PlatformDescriptor::new(Os::Linux, Arch::X86_64, "121.0.0.0"));
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
