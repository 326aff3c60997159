//! Child-side helpers: everything here runs between `fork` and `exec`,
//! or prepares data beforehand so the child does as little as possible.

use std::ffi::CString;
use std::io::{self, Write};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::unistd::execve;

use crate::error::{STATUS_NOT_FOUND, ShellError};

/// Look `name` up on a colon-separated search path.
///
/// Names containing `/` are returned as-is. Only regular files with an
/// execute bit count as hits.
pub fn resolve_program(name: &str, search_path: Option<&str>) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    if name.contains('/') {
        return Some(PathBuf::from(name));
    }
    search_path?
        .split(':')
        .map(|dir| if dir.is_empty() { "." } else { dir })
        .map(|dir| Path::new(dir).join(name))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

/// Program path, argv and environment converted up front, so the child
/// only has to call `execve`.
#[derive(Debug)]
pub struct ExecImage {
    name: String,
    path: Option<CString>,
    argv: Vec<CString>,
    env: Vec<CString>,
}

fn to_cstring(program: &str, text: &[u8]) -> Result<CString, ShellError> {
    CString::new(text).map_err(|_| ShellError::Exec {
        program: program.to_string(),
        source: Errno::EINVAL,
    })
}

impl ExecImage {
    pub fn new(
        argv: &[String],
        env: &[(String, String)],
        search_path: Option<&str>,
    ) -> Result<Self, ShellError> {
        let name = argv.first().cloned().unwrap_or_default();
        let path = resolve_program(&name, search_path)
            .map(|p| to_cstring(&name, p.as_os_str().as_bytes()))
            .transpose()?;
        let argv = argv
            .iter()
            .map(|arg| to_cstring(&name, arg.as_bytes()))
            .collect::<Result<Vec<_>, _>>()?;
        let env = env
            .iter()
            .map(|(k, v)| to_cstring(&name, format!("{k}={v}").as_bytes()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name,
            path,
            argv,
            env,
        })
    }

    /// Replace the current process image. Only call in a forked child.
    pub fn exec(&self) -> ! {
        let err = match &self.path {
            Some(path) => match execve(path, &self.argv, &self.env) {
                Ok(never) => match never {},
                Err(err) => err,
            },
            None => Errno::ENOENT,
        };
        let err = ShellError::Exec {
            program: self.name.clone(),
            source: err,
        };
        let _ = writeln!(io::stderr(), "{}: {err}", env!("CARGO_PKG_NAME"));
        child_exit(STATUS_NOT_FOUND)
    }
}

/// Leave a forked child without running the parent's exit handlers.
pub fn child_exit(status: i32) -> ! {
    let _ = io::stdout().flush();
    // SAFETY: _exit(2) never returns and skips atexit handlers that belong
    // to the parent shell.
    unsafe { libc::_exit(status) }
}
