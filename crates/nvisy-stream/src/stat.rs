//! Filesystem-style metadata synthesized from object and container facts.

use serde::{Deserialize, Serialize};

use crate::store::{ObjectInfo, Visibility};

/// Regular-file type bits.
const S_IFREG: u32 = 0o100_000;

/// Marker for fields the store has no notion of.
const UNKNOWN: i64 = -1;

/// Permission bits per container visibility.
///
/// The store has no per-object permissions; every object inherits the
/// pattern of its container's ACL.
const PERMISSIONS: [(Visibility, u32); 2] = [
    (Visibility::Public, S_IFREG | 0o644),
    (Visibility::Private, S_IFREG | 0o600),
];

/// Returns the mode bits for objects in a container with this visibility.
pub fn permissions(visibility: Visibility) -> u32 {
    PERMISSIONS
        .iter()
        .find(|(v, _)| *v == visibility)
        .map_or(S_IFREG, |(_, mode)| *mode)
}

/// A `stat(2)`-shaped record.
///
/// The named fields and [`to_array`](Self::to_array) carry identical values,
/// in the conventional order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub dev: i64,
    pub ino: i64,
    pub mode: u32,
    pub nlink: i64,
    pub uid: u32,
    pub gid: u32,
    pub rdev: i64,
    pub size: u64,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
    pub blksize: i64,
    pub blocks: i64,
}

impl Stat {
    /// Builds a record from a size, a single modification time, and the
    /// owning container's visibility.
    ///
    /// All three timestamps are set to `mtime`: the store tracks only one.
    pub fn new(size: u64, mtime: i64, visibility: Visibility) -> Self {
        let (uid, gid) = process_identity();
        Self {
            dev: 0,
            ino: 0,
            mode: permissions(visibility),
            nlink: 0,
            uid,
            gid,
            rdev: 0,
            size,
            atime: mtime,
            mtime,
            ctime: mtime,
            blksize: UNKNOWN,
            blocks: UNKNOWN,
        }
    }

    /// Builds a record from remote object metadata.
    pub fn from_object(info: &ObjectInfo, visibility: Visibility) -> Self {
        Self::new(info.content_length, info.mtime(), visibility)
    }

    /// Returns the positional form:
    /// `dev, ino, mode, nlink, uid, gid, rdev, size, atime, mtime, ctime, blksize, blocks`.
    pub fn to_array(&self) -> [i64; 13] {
        [
            self.dev,
            self.ino,
            i64::from(self.mode),
            self.nlink,
            i64::from(self.uid),
            i64::from(self.gid),
            self.rdev,
            i64::try_from(self.size).unwrap_or(i64::MAX),
            self.atime,
            self.mtime,
            self.ctime,
            self.blksize,
            self.blocks,
        ]
    }
}

/// Returns the current process's uid and gid.
#[cfg(unix)]
#[allow(unsafe_code)]
fn process_identity() -> (u32, u32) {
    // SAFETY: getuid/getgid take no arguments, cannot fail and touch no memory.
    unsafe { (libc::getuid(), libc::getgid()) }
}

/// Returns zero ids where the platform has no process identity.
#[cfg(not(unix))]
fn process_identity() -> (u32, u32) {
    (0, 0)
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;

    use super::*;

    #[test]
    fn exactly_two_permission_patterns() {
        let public = permissions(Visibility::Public);
        let private = permissions(Visibility::Private);
        assert_eq!(public, 0o100_644);
        assert_eq!(private, 0o100_600);
        assert_ne!(public, private);
        // private is strictly narrower
        assert_eq!(private & !public, 0);
    }

    #[test]
    fn permissions_ignore_object_properties() {
        let small = ObjectInfo::new("a");
        let large = ObjectInfo {
            name: "nested/b.bin".into(),
            content_length: 1 << 30,
            last_modified: Some(Timestamp::from_second(1_700_000_000).unwrap()),
        };
        for visibility in [Visibility::Public, Visibility::Private] {
            assert_eq!(
                Stat::from_object(&small, visibility).mode,
                Stat::from_object(&large, visibility).mode
            );
        }
    }

    #[test]
    fn timestamps_share_the_modification_time() {
        let info = ObjectInfo {
            name: "a.txt".into(),
            content_length: 42,
            last_modified: Some(Timestamp::from_second(1_600_000_000).unwrap()),
        };
        let stat = Stat::from_object(&info, Visibility::Private);
        assert_eq!(stat.size, 42);
        assert_eq!(stat.atime, 1_600_000_000);
        assert_eq!(stat.mtime, 1_600_000_000);
        assert_eq!(stat.ctime, 1_600_000_000);
        assert_eq!(stat.blksize, -1);
        assert_eq!(stat.blocks, -1);
    }

    #[test]
    fn positional_form_matches_named_fields() {
        let stat = Stat::new(7, 99, Visibility::Public);
        let array = stat.to_array();
        assert_eq!(array[2], i64::from(stat.mode));
        assert_eq!(array[4], i64::from(stat.uid));
        assert_eq!(array[5], i64::from(stat.gid));
        assert_eq!(array[7], 7);
        assert_eq!(&array[8..11], &[99, 99, 99]);
        assert_eq!(&array[11..], &[-1, -1]);
    }

    #[test]
    fn serializes_named_fields() {
        let stat = Stat::new(1, 2, Visibility::Public);
        let json = serde_json::to_value(stat).unwrap();
        assert_eq!(json["size"], 1);
        assert_eq!(json["mtime"], 2);
        assert_eq!(json["mode"], 0o100_644);
    }
}
