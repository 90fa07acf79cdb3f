//! FUSE filesystem trait implementation for HdfsFs.
//!
//! Every hook decodes its arguments, calls the dispatcher once, and turns
//! the outcome into exactly one reply. `FsError::errno` is the only place
//! failures become error codes.
//!
//! All remote calls block the calling FUSE worker on the tokio runtime.

#[cfg(feature = "fuse")]
mod implementation {
    use fuser::{
        FileAttr, FileType, Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory,
        ReplyEmpty, ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, ReplyXattr, Request,
        TimeOrNow,
    };
    use std::ffi::OsStr;
    use std::path::Path;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use crate::fuse::attr::{FileAttributes, NodeKind};
    use crate::fuse::dispatcher::{SetAttrRequest, XattrReply, DIRENT_SIZE, GENERATION};
    use crate::fuse::error::FsError;
    use crate::fuse::HdfsFs;

    /// Buffer size assumed for one readdir call; fuser does not pass the
    /// kernel's size through.
    const READDIR_BUFFER: u32 = 128 * DIRENT_SIZE;

    fn file_type(kind: NodeKind) -> FileType {
        match kind {
            NodeKind::Directory => FileType::Directory,
            NodeKind::Symlink => FileType::Symlink,
            NodeKind::File | NodeKind::Unknown => FileType::RegularFile,
        }
    }

    fn system_time(ns: i64) -> SystemTime {
        if ns >= 0 {
            UNIX_EPOCH + Duration::from_nanos(ns as u64)
        } else {
            UNIX_EPOCH - Duration::from_nanos(ns.unsigned_abs())
        }
    }

    fn to_file_attr(attr: &FileAttributes) -> FileAttr {
        let mtime = system_time(attr.mtime_ns);
        FileAttr {
            ino: attr.ino,
            size: attr.size,
            blocks: attr.blocks,
            atime: system_time(attr.atime_ns),
            mtime,
            ctime: system_time(attr.ctime_ns),
            crtime: mtime,
            kind: file_type(attr.kind),
            perm: attr.perm,
            nlink: attr.nlink,
            uid: attr.uid,
            gid: attr.gid,
            rdev: 0,
            blksize: attr.blksize,
            flags: 0,
        }
    }

    fn time_to_millis(time: TimeOrNow) -> i64 {
        let at = match time {
            TimeOrNow::SpecificTime(t) => t,
            TimeOrNow::Now => SystemTime::now(),
        };
        match at.duration_since(UNIX_EPOCH) {
            Ok(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX),
            Err(e) => -i64::try_from(e.duration().as_millis()).unwrap_or(i64::MAX),
        }
    }

    fn name_str(name: &OsStr) -> Result<&str, FsError> {
        name.to_str().ok_or(FsError::InvalidName)
    }

    fn fail(hook: &str, err: &FsError) -> libc::c_int {
        if err.is_not_found() {
            log::debug!("{}: {}", hook, err);
        } else {
            log::warn!("{}: {}", hook, err);
        }
        err.errno()
    }

    impl Filesystem for HdfsFs {
        fn init(
            &mut self,
            _req: &Request<'_>,
            _config: &mut fuser::KernelConfig,
        ) -> Result<(), libc::c_int> {
            log::info!("HdfsFs::init");
            Ok(())
        }

        fn destroy(&mut self) {
            log::info!("HdfsFs destroyed");
        }

        fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
            let result = name_str(name).and_then(|n| self.dispatcher.lookup(parent, n));
            match result {
                Ok(attr) => reply.entry(&self.attr_ttl, &to_file_attr(&attr), GENERATION),
                Err(e) => reply.error(fail("lookup", &e)),
            }
        }

        fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
            match self.dispatcher.getattr(ino) {
                Ok(attr) => reply.attr(&self.attr_ttl, &to_file_attr(&attr)),
                Err(e) => reply.error(fail("getattr", &e)),
            }
        }

        /// Size, mode and times go to the store; ownership and ctime are
        /// not settable remotely and are ignored.
        fn setattr(
            &mut self,
            _req: &Request<'_>,
            ino: u64,
            mode: Option<u32>,
            _uid: Option<u32>,
            _gid: Option<u32>,
            size: Option<u64>,
            atime: Option<TimeOrNow>,
            mtime: Option<TimeOrNow>,
            _ctime: Option<SystemTime>,
            _fh: Option<u64>,
            _crtime: Option<SystemTime>,
            _chgtime: Option<SystemTime>,
            _bkuptime: Option<SystemTime>,
            _flags: Option<u32>,
            reply: ReplyAttr,
        ) {
            let request = SetAttrRequest {
                mode,
                size,
                atime_ms: atime.map(time_to_millis),
                mtime_ms: mtime.map(time_to_millis),
            };
            match self.dispatcher.setattr(ino, &request) {
                Ok(attr) => reply.attr(&self.attr_ttl, &to_file_attr(&attr)),
                Err(e) => reply.error(fail("setattr", &e)),
            }
        }

        fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
            match self.dispatcher.readlink(ino) {
                Ok(target) => reply.data(&target),
                Err(e) => reply.error(fail("readlink", &e)),
            }
        }

        fn mkdir(
            &mut self,
            _req: &Request<'_>,
            parent: u64,
            name: &OsStr,
            mode: u32,
            _umask: u32,
            reply: ReplyEntry,
        ) {
            let result = name_str(name).and_then(|n| self.dispatcher.mkdir(parent, n, mode));
            match result {
                Ok(attr) => reply.entry(&self.attr_ttl, &to_file_attr(&attr), GENERATION),
                Err(e) => reply.error(fail("mkdir", &e)),
            }
        }

        fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
            match name_str(name).and_then(|n| self.dispatcher.unlink(parent, n)) {
                Ok(()) => reply.ok(),
                Err(e) => reply.error(fail("unlink", &e)),
            }
        }

        fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
            match name_str(name).and_then(|n| self.dispatcher.rmdir(parent, n)) {
                Ok(()) => reply.ok(),
                Err(e) => reply.error(fail("rmdir", &e)),
            }
        }

        fn symlink(
            &mut self,
            _req: &Request<'_>,
            parent: u64,
            link_name: &OsStr,
            target: &Path,
            reply: ReplyEntry,
        ) {
            let result = name_str(link_name).and_then(|n| {
                let target = target.to_str().ok_or(FsError::InvalidName)?;
                self.dispatcher.symlink(parent, n, target)
            });
            match result {
                Ok(attr) => reply.entry(&self.attr_ttl, &to_file_attr(&attr), GENERATION),
                Err(e) => reply.error(fail("symlink", &e)),
            }
        }

        fn rename(
            &mut self,
            _req: &Request<'_>,
            parent: u64,
            name: &OsStr,
            newparent: u64,
            newname: &OsStr,
            _flags: u32,
            reply: ReplyEmpty,
        ) {
            let result = name_str(name).and_then(|from| {
                let to = name_str(newname)?;
                self.dispatcher.rename(parent, from, newparent, to)
            });
            match result {
                Ok(()) => reply.ok(),
                Err(e) => reply.error(fail("rename", &e)),
            }
        }

        /// Handles are not tracked; every read and write goes to the store.
        fn open(&mut self, _req: &Request<'_>, _ino: u64, _flags: i32, reply: ReplyOpen) {
            reply.opened(0, 0);
        }

        fn read(
            &mut self,
            _req: &Request<'_>,
            ino: u64,
            _fh: u64,
            offset: i64,
            size: u32,
            _flags: i32,
            _lock: Option<u64>,
            reply: ReplyData,
        ) {
            match self.dispatcher.read(ino, offset, size) {
                Ok(data) => reply.data(&data),
                Err(e) => reply.error(fail("read", &e)),
            }
        }

        fn write(
            &mut self,
            _req: &Request<'_>,
            ino: u64,
            _fh: u64,
            offset: i64,
            data: &[u8],
            _write_flags: u32,
            _flags: i32,
            _lock_owner: Option<u64>,
            reply: ReplyWrite,
        ) {
            match self.dispatcher.write(ino, offset, data) {
                Ok(written) => reply.written(written),
                Err(e) => reply.error(fail("write", &e)),
            }
        }

        fn flush(
            &mut self,
            _req: &Request<'_>,
            _ino: u64,
            _fh: u64,
            _lock_owner: u64,
            reply: ReplyEmpty,
        ) {
            reply.ok();
        }

        fn release(
            &mut self,
            _req: &Request<'_>,
            _ino: u64,
            _fh: u64,
            _flags: i32,
            _lock_owner: Option<u64>,
            _flush: bool,
            reply: ReplyEmpty,
        ) {
            reply.ok();
        }

        fn opendir(&mut self, _req: &Request<'_>, _ino: u64, _flags: i32, reply: ReplyOpen) {
            reply.opened(0, 0);
        }

        fn readdir(
            &mut self,
            _req: &Request<'_>,
            ino: u64,
            _fh: u64,
            offset: i64,
            mut reply: ReplyDirectory,
        ) {
            let entries = match self.dispatcher.readdir(ino, READDIR_BUFFER, offset) {
                Ok(entries) => entries,
                Err(e) => {
                    reply.error(fail("readdir", &e));
                    return;
                }
            };
            for entry in entries {
                if reply.add(entry.ino, entry.offset, file_type(entry.kind), &entry.name) {
                    break;
                }
            }
            reply.ok();
        }

        fn releasedir(
            &mut self,
            _req: &Request<'_>,
            _ino: u64,
            _fh: u64,
            _flags: i32,
            reply: ReplyEmpty,
        ) {
            reply.ok();
        }

        fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
            let st = self.dispatcher.statfs();
            reply.statfs(
                st.blocks, st.bfree, st.bavail, st.files, st.ffree, st.bsize, st.namelen,
                st.frsize,
            );
        }

        fn setxattr(
            &mut self,
            _req: &Request<'_>,
            ino: u64,
            name: &OsStr,
            value: &[u8],
            flags: i32,
            _position: u32,
            reply: ReplyEmpty,
        ) {
            match name_str(name).and_then(|n| self.dispatcher.setxattr(ino, n, value, flags)) {
                Ok(()) => reply.ok(),
                Err(e) => reply.error(fail("setxattr", &e)),
            }
        }

        fn getxattr(
            &mut self,
            _req: &Request<'_>,
            ino: u64,
            name: &OsStr,
            size: u32,
            reply: ReplyXattr,
        ) {
            match name_str(name).and_then(|n| self.dispatcher.getxattr(ino, n, size)) {
                Ok(XattrReply::Size(len)) => reply.size(len),
                Ok(XattrReply::Data(data)) => reply.data(&data),
                Err(e) => reply.error(fail("getxattr", &e)),
            }
        }

        fn listxattr(&mut self, _req: &Request<'_>, ino: u64, size: u32, reply: ReplyXattr) {
            match self.dispatcher.listxattr(ino, size) {
                Ok(XattrReply::Size(len)) => reply.size(len),
                Ok(XattrReply::Data(data)) => reply.data(&data),
                Err(e) => reply.error(fail("listxattr", &e)),
            }
        }

        fn removexattr(&mut self, _req: &Request<'_>, ino: u64, name: &OsStr, reply: ReplyEmpty) {
            match name_str(name).and_then(|n| self.dispatcher.removexattr(ino, n)) {
                Ok(()) => reply.ok(),
                Err(e) => reply.error(fail("removexattr", &e)),
            }
        }

        fn create(
            &mut self,
            _req: &Request<'_>,
            parent: u64,
            name: &OsStr,
            mode: u32,
            _umask: u32,
            _flags: i32,
            reply: ReplyCreate,
        ) {
            let result = name_str(name).and_then(|n| self.dispatcher.create(parent, n, mode));
            match result {
                Ok(attr) => {
                    reply.created(&self.attr_ttl, &to_file_attr(&attr), GENERATION, 0, 0)
                }
                Err(e) => reply.error(fail("create", &e)),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_to_file_attr() {
            let attr = FileAttributes {
                ino: 16390,
                kind: NodeKind::Directory,
                size: 4096,
                blocks: 8,
                nlink: 2,
                uid: 1000,
                gid: 1000,
                perm: 0o755,
                blksize: 4096,
                atime_ns: 1_500_000_000,
                mtime_ns: 2_000_000_000,
                ctime_ns: 2_000_000_000,
            };
            let fa = to_file_attr(&attr);
            assert_eq!(fa.ino, 16390);
            assert_eq!(fa.kind, FileType::Directory);
            assert_eq!(fa.perm, 0o755);
            assert_eq!(fa.mtime, UNIX_EPOCH + Duration::from_secs(2));
            assert_eq!(fa.atime, UNIX_EPOCH + Duration::from_millis(1500));
        }

        #[test]
        fn test_unknown_kind_is_regular_file() {
            assert_eq!(file_type(NodeKind::Unknown), FileType::RegularFile);
            assert_eq!(file_type(NodeKind::Symlink), FileType::Symlink);
        }

        #[test]
        fn test_time_to_millis() {
            let t = UNIX_EPOCH + Duration::from_millis(1_320_171_722_771);
            assert_eq!(time_to_millis(TimeOrNow::SpecificTime(t)), 1_320_171_722_771);
        }
    }
}
