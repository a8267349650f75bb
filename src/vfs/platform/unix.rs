/*!
 * Unix Relative-Open Primitives
 * Thin wrappers over the *at() syscall family, all anchored on a directory fd
 *
 * Every wrapper that touches a leaf name uses no-follow semantics: symlinks
 * are expanded by the resolver, never by the kernel on our behalf.
 */

use std::ffi::{CStr, CString, OsStr, OsString};
use std::fs::File;
use std::io;
use std::mem;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::vfs::types::{system_time_from_parts, FileType, Permissions, RawStat, Stat};

/// Open directory used as the base for relative resolution
///
/// Closed on drop; never shared between operations.
#[derive(Debug)]
pub struct DirHandle {
    fd: OwnedFd,
}

impl DirHandle {
    #[inline]
    pub fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }

    /// Open an absolute directory path (only ever used for Root)
    ///
    /// Root is canonical, so its last component is never a symlink; one
    /// found there now was swapped in and is refused.
    pub fn open_root(path: &Path) -> io::Result<Self> {
        let cstr = c_name(path.as_os_str())?;
        let flags = libc::O_RDONLY | libc::O_DIRECTORY | libc::O_CLOEXEC | libc::O_NOFOLLOW;
        let fd = unsafe { libc::open(cstr.as_ptr(), flags) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self {
            fd: unsafe { OwnedFd::from_raw_fd(fd) },
        })
    }
}

/// Convert a path component into a NUL-terminated name
pub fn c_name(name: &OsStr) -> io::Result<CString> {
    CString::new(name.as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "name contains NUL"))
}

/// Open a child directory without following a symlink in `name`
pub fn open_dir_at(parent: &DirHandle, name: &CStr) -> io::Result<DirHandle> {
    let flags = libc::O_RDONLY | libc::O_DIRECTORY | libc::O_CLOEXEC | libc::O_NOFOLLOW;
    let fd = unsafe { libc::openat(parent.as_raw_fd(), name.as_ptr(), flags) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(DirHandle {
        fd: unsafe { OwnedFd::from_raw_fd(fd) },
    })
}

/// Open a file relative to `parent`; `O_NOFOLLOW | O_CLOEXEC` are forced
pub fn open_at(parent: &DirHandle, name: &CStr, oflags: libc::c_int, mode: u32) -> io::Result<File> {
    let oflags = oflags | libc::O_NOFOLLOW | libc::O_CLOEXEC;
    let fd = unsafe {
        libc::openat(
            parent.as_raw_fd(),
            name.as_ptr(),
            oflags,
            mode as libc::c_uint,
        )
    };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { File::from_raw_fd(fd) })
}

/// lstat relative to `parent`
pub fn stat_at(parent: &DirHandle, name: &CStr) -> io::Result<libc::stat> {
    let mut st = unsafe { mem::zeroed::<libc::stat>() };
    let res = unsafe {
        libc::fstatat(
            parent.as_raw_fd(),
            name.as_ptr(),
            &mut st,
            libc::AT_SYMLINK_NOFOLLOW,
        )
    };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(st)
}

pub fn mkdir_at(parent: &DirHandle, name: &CStr, mode: u32) -> io::Result<()> {
    let res = unsafe { libc::mkdirat(parent.as_raw_fd(), name.as_ptr(), mode as libc::mode_t) };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub fn unlink_at(parent: &DirHandle, name: &CStr) -> io::Result<()> {
    let res = unsafe { libc::unlinkat(parent.as_raw_fd(), name.as_ptr(), 0) };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub fn rmdir_at(parent: &DirHandle, name: &CStr) -> io::Result<()> {
    let res = unsafe { libc::unlinkat(parent.as_raw_fd(), name.as_ptr(), libc::AT_REMOVEDIR) };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// unlink, falling back to rmdir for directories (`remove(3)` semantics)
///
/// When both fail, the rmdir error wins unless the target was not a
/// directory at all.
pub fn remove_at(parent: &DirHandle, name: &CStr) -> io::Result<()> {
    match unlink_at(parent, name) {
        Ok(()) => Ok(()),
        Err(unlink_err) => match rmdir_at(parent, name) {
            Ok(()) => Ok(()),
            Err(rmdir_err) if rmdir_err.raw_os_error() == Some(libc::ENOTDIR) => Err(unlink_err),
            Err(rmdir_err) => Err(rmdir_err),
        },
    }
}

pub fn rename_at(
    old_parent: &DirHandle,
    old_name: &CStr,
    new_parent: &DirHandle,
    new_name: &CStr,
) -> io::Result<()> {
    let res = unsafe {
        libc::renameat(
            old_parent.as_raw_fd(),
            old_name.as_ptr(),
            new_parent.as_raw_fd(),
            new_name.as_ptr(),
        )
    };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub fn symlink_at(parent: &DirHandle, name: &CStr, target: &CStr) -> io::Result<()> {
    let res = unsafe { libc::symlinkat(target.as_ptr(), parent.as_raw_fd(), name.as_ptr()) };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Read a symlink target; fails with `EINVAL` when `name` is not a symlink
pub fn readlink_at(parent: &DirHandle, name: &CStr) -> io::Result<OsString> {
    let mut buf = vec![0u8; 256];
    loop {
        let res = unsafe {
            libc::readlinkat(
                parent.as_raw_fd(),
                name.as_ptr(),
                buf.as_mut_ptr() as *mut libc::c_char,
                buf.len(),
            )
        };
        if res < 0 {
            return Err(io::Error::last_os_error());
        }
        let len = res as usize;
        if len < buf.len() {
            buf.truncate(len);
            return Ok(OsString::from_vec(buf));
        }
        buf.resize(buf.len() * 2, 0);
    }
}

/// chown without following a symlink leaf; `None` leaves the id unchanged
pub fn chown_at(parent: &DirHandle, name: &CStr, uid: Option<u32>, gid: Option<u32>) -> io::Result<()> {
    let uid = uid.map(|v| v as libc::uid_t).unwrap_or(!0);
    let gid = gid.map(|v| v as libc::gid_t).unwrap_or(!0);
    let res = unsafe {
        libc::fchownat(
            parent.as_raw_fd(),
            name.as_ptr(),
            uid,
            gid,
            libc::AT_SYMLINK_NOFOLLOW,
        )
    };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub fn utimens_at(parent: &DirHandle, name: &CStr, atime: SystemTime, mtime: SystemTime) -> io::Result<()> {
    let times = [timespec(atime)?, timespec(mtime)?];
    let res = unsafe {
        libc::utimensat(
            parent.as_raw_fd(),
            name.as_ptr(),
            times.as_ptr(),
            libc::AT_SYMLINK_NOFOLLOW,
        )
    };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// fchmodat() always follows symlinks, so chmod goes through an fd opened
/// with `O_NOFOLLOW` instead.
///
/// An unreadable leaf cannot be opened; it is lstat'ed and changed with
/// fchmodat() only when it is not a symlink.
pub fn chmod_at(parent: &DirHandle, name: &CStr, mode: u32) -> io::Result<()> {
    let file = match open_at(parent, name, libc::O_RDONLY | libc::O_NONBLOCK, 0) {
        Ok(file) => file,
        Err(err) if err.raw_os_error() == Some(libc::EACCES) => {
            let st = stat_at(parent, name)?;
            if FileType::from_mode(st.st_mode as u32) == FileType::Symlink {
                return Err(io::Error::from_raw_os_error(libc::ELOOP));
            }
            let res = unsafe {
                libc::fchmodat(parent.as_raw_fd(), name.as_ptr(), mode as libc::mode_t, 0)
            };
            if res < 0 {
                return Err(io::Error::last_os_error());
            }
            return Ok(());
        }
        Err(err) => return Err(err),
    };
    let res = unsafe { libc::fchmod(file.as_raw_fd(), mode as libc::mode_t) };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn timespec(time: SystemTime) -> io::Result<libc::timespec> {
    let since = time
        .duration_since(UNIX_EPOCH)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "time before epoch"))?;
    Ok(libc::timespec {
        tv_sec: since.as_secs() as libc::time_t,
        tv_nsec: since.subsec_nanos() as _,
    })
}

/// Names of every entry in `dir`, excluding `.` and `..`
///
/// The directory stream works on a duplicate of the fd, so `dir` stays usable.
pub fn read_names(dir: &DirHandle) -> io::Result<Vec<OsString>> {
    let stream = DirStream::open(dir)?;
    let mut names = Vec::new();
    loop {
        set_errno(0);
        let ent = unsafe { libc::readdir(stream.dirp) };
        if ent.is_null() {
            let err = errno();
            if err == 0 {
                break;
            }
            return Err(io::Error::from_raw_os_error(err));
        }
        let name = unsafe { CStr::from_ptr((*ent).d_name.as_ptr()) }.to_bytes();
        if name == b"." || name == b".." {
            continue;
        }
        names.push(OsString::from_vec(name.to_vec()));
    }
    Ok(names)
}

/// `DIR*` owned for the duration of one listing
struct DirStream {
    dirp: *mut libc::DIR,
}

impl DirStream {
    fn open(dir: &DirHandle) -> io::Result<Self> {
        let dup_fd = unsafe { libc::fcntl(dir.as_raw_fd(), libc::F_DUPFD_CLOEXEC, 0) };
        if dup_fd < 0 {
            return Err(io::Error::last_os_error());
        }
        let dirp = unsafe { libc::fdopendir(dup_fd) };
        if dirp.is_null() {
            let err = io::Error::last_os_error();
            unsafe { libc::close(dup_fd) };
            return Err(err);
        }
        // The duplicate shares the file offset with `dir`.
        unsafe { libc::rewinddir(dirp) };
        Ok(Self { dirp })
    }
}

impl Drop for DirStream {
    fn drop(&mut self) {
        unsafe { libc::closedir(self.dirp) };
    }
}

/// Convert a host stat into the engine's Stat
pub fn stat_from_libc(name: String, st: &libc::stat) -> Stat {
    let raw = RawStat {
        dev: st.st_dev as u64,
        ino: st.st_ino as u64,
        nlink: st.st_nlink as u64,
        uid: st.st_uid,
        gid: st.st_gid,
        mode: st.st_mode as u32,
        blocks: st.st_blocks as u64,
        atime: st.st_atime as i64,
        ctime: st.st_ctime as i64,
    };
    Stat {
        name,
        size: st.st_size as u64,
        mode: Permissions::new(st.st_mode as u32),
        modified: system_time_from_parts(st.st_mtime as i64, st.st_mtime_nsec as i64),
        file_type: FileType::from_mode(st.st_mode as u32),
        raw,
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn errno() -> i32 {
    unsafe { *libc::__errno_location() }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn set_errno(val: i32) {
    unsafe {
        *libc::__errno_location() = val;
    }
}

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
))]
fn errno() -> i32 {
    unsafe { *libc::__error() }
}

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
))]
fn set_errno(val: i32) {
    unsafe {
        *libc::__error() = val;
    }
}

// Without a writable errno a NULL readdir() is read as end of stream.
#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
)))]
fn errno() -> i32 {
    0
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
)))]
fn set_errno(_val: i32) {}
