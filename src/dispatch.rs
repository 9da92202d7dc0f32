use std::{
    collections::BTreeMap,
    convert::Infallible,
    env,
    ffi::OsString,
    io::{self, Write},
    path::{Path, PathBuf},
    process::Command,
};

use tracing::{debug, info};

use crate::{
    aws::Credentials,
    constants::{ACCESS_KEY_ID_VAR, SECRET_ACCESS_KEY_VAR, SESSION_TOKEN_VAR},
    error::DispatchError,
};

/// Variables added on top of the inherited environment of the launched program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverlay(BTreeMap<String, String>);

impl EnvOverlay {
    pub fn from_credentials(creds: &Credentials) -> Self {
        let mut vars = BTreeMap::new();
        vars.insert(ACCESS_KEY_ID_VAR.to_string(), creds.access_key_id.clone());
        vars.insert(
            SECRET_ACCESS_KEY_VAR.to_string(),
            creds.secret_access_key.clone(),
        );
        vars.insert(SESSION_TOKEN_VAR.to_string(), creds.session_token.clone());
        Self(vars)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Terminal hand-off to another program
pub trait ProcessLauncher {
    /// Replace the current process with `program`.
    ///
    /// Never returns on success; the only possible return is the failure.
    fn replace(
        &self,
        program: &Path,
        args: &[String],
        overlay: &EnvOverlay,
    ) -> Result<Infallible, io::Error>;
}

/// Launcher that replaces the process image via `execve`
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecLauncher;

impl ExecLauncher {
    fn command(program: &Path, args: &[String], overlay: &EnvOverlay) -> Command {
        let mut command = Command::new(program);
        command.args(args.iter().skip(1));
        command.envs(overlay.iter());
        command
    }
}

#[cfg(unix)]
impl ProcessLauncher for ExecLauncher {
    fn replace(
        &self,
        program: &Path,
        args: &[String],
        overlay: &EnvOverlay,
    ) -> Result<Infallible, io::Error> {
        use std::os::unix::process::CommandExt;

        let mut command = Self::command(program, args, overlay);
        if let Some(arg0) = args.first() {
            command.arg0(arg0);
        }
        Err(command.exec())
    }
}

#[cfg(not(unix))]
impl ProcessLauncher for ExecLauncher {
    fn replace(
        &self,
        program: &Path,
        args: &[String],
        overlay: &EnvOverlay,
    ) -> Result<Infallible, io::Error> {
        let status = Self::command(program, args, overlay).status()?;
        std::process::exit(status.code().unwrap_or(1))
    }
}

/// Write the credentials as a single shell `export` statement
pub fn write_exports<W: Write>(creds: &Credentials, out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "export {}={} {}={} {}={}",
        ACCESS_KEY_ID_VAR,
        creds.access_key_id,
        SECRET_ACCESS_KEY_VAR,
        creds.secret_access_key,
        SESSION_TOKEN_VAR,
        creds.session_token,
    )?;
    out.flush()
}

/// Resolve `name` to an executable using the current `PATH`
pub fn look_path(name: &str) -> Result<PathBuf, DispatchError> {
    look_path_in(name, env::var_os("PATH"))
}

/// Executable search: names with a separator are checked as given, others are
/// tried against each `PATH` entry in order; an empty entry means the current directory
pub fn look_path_in(name: &str, path_var: Option<OsString>) -> Result<PathBuf, DispatchError> {
    let not_found = || DispatchError::NotFound {
        program: name.to_string(),
    };

    if name.is_empty() {
        return Err(not_found());
    }

    if name.contains(std::path::MAIN_SEPARATOR) || name.contains('/') {
        let candidate = PathBuf::from(name);
        return is_executable(&candidate).then_some(candidate).ok_or_else(not_found);
    }

    let path_var = path_var.ok_or_else(not_found)?;
    env::split_paths(&path_var)
        .map(|dir| {
            if dir.as_os_str().is_empty() {
                PathBuf::from(".").join(name)
            } else {
                dir.join(name)
            }
        })
        .find(|candidate| is_executable(candidate))
        .ok_or_else(not_found)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.metadata().is_ok_and(|meta| meta.is_file())
}

/// Hands the final role credentials to the shell or to a target program
pub struct Dispatcher<'a, W, L> {
    out: W,
    launcher: &'a L,
    path_var: Option<OsString>,
}

impl<'a, W: Write, L: ProcessLauncher> Dispatcher<'a, W, L> {
    pub fn new(out: W, launcher: &'a L) -> Self {
        Self {
            out,
            launcher,
            path_var: env::var_os("PATH"),
        }
    }

    pub fn with_path(mut self, path_var: Option<OsString>) -> Self {
        self.path_var = path_var;
        self
    }

    /// Print exports when `args` is empty, otherwise exec `args[0]` with the credentials.
    ///
    /// Only returns `Ok` on the export path.
    pub fn dispatch(&mut self, creds: &Credentials, args: &[String]) -> Result<(), DispatchError> {
        let Some(name) = args.first() else {
            debug!("No command given, printing exports");
            return write_exports(creds, &mut self.out).map_err(DispatchError::Output);
        };

        let program = look_path_in(name, self.path_var.clone())?;
        let overlay = EnvOverlay::from_credentials(creds);

        info!("Executing {}", program.display());
        match self.launcher.replace(&program, args, &overlay) {
            Ok(never) => match never {},
            Err(source) => Err(DispatchError::Exec { program, source }),
        }
    }
}
