//! Platform tag translation.
//!
//! The upstream listing names operating systems and architectures with its
//! own vocabulary (`mac`, `x64`, ...). This module maps the names reported by
//! the running process onto that vocabulary.
//!
//! ## Vocabulary
//!
//! | Process name            | Tag       |
//! |-------------------------|-----------|
//! | `darwin`, `macos`       | `mac`     |
//! | `windows`               | `windows` |
//! | `linux`                 | `linux`   |
//! | `amd64`, `x86_64`       | `x64`     |
//! | `arm64`, `aarch64`      | `arm64`   |
//!
//! Anything else translates to an empty tag, which never matches.

use std::fmt;

/// Operating system and architecture tags in the listing's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformTags {
    /// OS tag (`mac`, `windows`, `linux`), or empty when unknown.
    pub os: &'static str,
    /// Architecture tag (`x64`, `arm64`), or empty when unknown.
    pub arch: &'static str,
}

impl PlatformTags {
    /// Translates raw OS and architecture names into listing tags.
    ///
    /// Total and side-effect free: unknown names yield an empty tag.
    ///
    /// # Examples
    ///
    /// ```
    /// use toolup_catalog::PlatformTags;
    ///
    /// let tags = PlatformTags::translate("darwin", "arm64");
    /// assert_eq!((tags.os, tags.arch), ("mac", "arm64"));
    /// ```
    #[must_use = "returns the translated tags without side effects"]
    pub fn translate(os_name: &str, arch_name: &str) -> Self {
        Self {
            os: os_tag(os_name),
            arch: arch_tag(arch_name),
        }
    }

    /// Returns the tags of the platform this process is running on.
    #[must_use = "returns the current tags without side effects"]
    pub fn current() -> Self {
        Self::translate(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Returns `true` when both tags are known.
    ///
    /// Artifacts are never built for an unsupported pair.
    #[must_use]
    pub fn is_supported(self) -> bool {
        !self.os.is_empty() && !self.arch.is_empty()
    }
}

impl fmt::Display for PlatformTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_supported() {
            write!(f, "{}-{}", self.os, self.arch)
        } else {
            write!(f, "unsupported")
        }
    }
}

/// Maps an OS name onto the listing's OS tag.
#[must_use]
pub fn os_tag(os_name: &str) -> &'static str {
    match os_name {
        "darwin" | "macos" => "mac",
        "windows" => "windows",
        "linux" => "linux",
        _ => "",
    }
}

/// Maps an architecture name onto the listing's architecture tag.
#[must_use]
pub fn arch_tag(arch_name: &str) -> &'static str {
    match arch_name {
        "amd64" | "x86_64" => "x64",
        "arm64" | "aarch64" => "arm64",
        _ => "",
    }
}
