//! Open-mode tokens and the capability flags they grant.

use std::fmt;

use strum::{AsRefStr, IntoStaticStr};

/// Capability flags derived once from an [`OpenMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeFlags {
    pub can_read: bool,
    pub can_write: bool,
    pub truncate_on_open: bool,
    pub append_only: bool,
    pub create_if_absent: bool,
    pub fail_if_exists: bool,
    pub never_persist: bool,
}

impl ModeFlags {
    /// Whether synchronization may ever reach the remote store.
    pub fn persists(&self) -> bool {
        self.can_write && !self.never_persist
    }
}

/// An open-mode token.
///
/// Parsing is case-insensitive and ignores the `b`/`t` markers, since content
/// is always handled as opaque bytes. Unrecognised tokens map to
/// [`OpenMode::Fallback`], which behaves like `c+`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum OpenMode {
    /// `r`
    Read,
    /// `r+`
    ReadWrite,
    /// `w`
    Write,
    /// `w+`
    WriteRead,
    /// `a`
    Append,
    /// `a+`
    AppendRead,
    /// `x`
    Exclusive,
    /// `x+`
    ExclusiveRead,
    /// `c`
    Create,
    /// `c+`
    CreateRead,
    /// `nope`: full read/write that never reaches the remote store.
    Debug,
    /// Any other token.
    Fallback,
}

impl OpenMode {
    /// Interprets a mode token.
    pub fn parse(token: &str) -> Self {
        let normalized: String = token
            .chars()
            .map(|c| c.to_ascii_lowercase())
            .filter(|c| !matches!(c, 'b' | 't'))
            .collect();

        match normalized.as_str() {
            "r" => Self::Read,
            "r+" => Self::ReadWrite,
            "w" => Self::Write,
            "w+" => Self::WriteRead,
            "a" => Self::Append,
            "a+" => Self::AppendRead,
            "x" => Self::Exclusive,
            "x+" => Self::ExclusiveRead,
            "c" => Self::Create,
            "c+" => Self::CreateRead,
            "nope" => Self::Debug,
            _ => Self::Fallback,
        }
    }

    /// Returns the capability flags granted by this mode.
    pub const fn flags(self) -> ModeFlags {
        const fn row(
            can_read: bool,
            can_write: bool,
            truncate_on_open: bool,
            append_only: bool,
            create_if_absent: bool,
            fail_if_exists: bool,
            never_persist: bool,
        ) -> ModeFlags {
            ModeFlags {
                can_read,
                can_write,
                truncate_on_open,
                append_only,
                create_if_absent,
                fail_if_exists,
                never_persist,
            }
        }

        //                       read   write  trunc  append create excl   never
        match self {
            Self::Read => row(true, false, false, false, false, false, false),
            Self::ReadWrite => row(true, true, false, false, false, false, false),
            Self::Write => row(false, true, true, false, true, false, false),
            Self::WriteRead => row(true, true, true, false, true, false, false),
            Self::Append => row(false, true, false, true, true, false, false),
            Self::AppendRead => row(true, true, false, true, true, false, false),
            Self::Exclusive => row(false, true, false, false, true, true, false),
            Self::ExclusiveRead => row(true, true, false, false, true, true, false),
            Self::Create => row(false, true, false, false, true, false, false),
            Self::CreateRead => row(true, true, false, false, true, false, false),
            Self::Debug => row(true, true, false, false, true, false, true),
            Self::Fallback => row(true, true, false, false, true, false, false),
        }
    }
}

impl From<&str> for OpenMode {
    fn from(token: &str) -> Self {
        Self::parse(token)
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}
