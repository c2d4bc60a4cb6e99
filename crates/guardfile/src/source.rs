//! Locate and compose Guardfile source text.
//!
//! Precedence: inline contents, then an explicit path, then `<cwd>/Guardfile`, then
//! `~/.Guardfile`. When `~/.guard.rb` exists its content is appended to whichever primary source
//! won, joined by a single newline.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::Error;

/// File name of the project Guardfile.
pub const GUARDFILE: &str = "Guardfile";
/// File name of the home-directory fallback Guardfile.
pub const HOME_GUARDFILE: &str = ".Guardfile";
/// File name of the user override appended to every Guardfile.
pub const USER_CONFIG: &str = ".guard.rb";

/// Inline Guardfile contents supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardfileContents {
    /// Use this text verbatim, even when empty.
    Text(String),
    /// Skip evaluation entirely: no source, no diagnostics.
    Skip,
}

/// Default locations searched when no inline contents or explicit path are given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPaths {
    /// `<cwd>/Guardfile`.
    pub local: PathBuf,
    /// `~/.Guardfile`, when a home directory is known.
    pub home: Option<PathBuf>,
    /// `~/.guard.rb`, when a home directory is known.
    pub user_config: Option<PathBuf>,
}

impl SearchPaths {
    /// Paths rooted at `cwd` and an optional `home` directory.
    pub fn new(cwd: &Path, home: Option<&Path>) -> Self {
        Self {
            local: cwd.join(GUARDFILE),
            home: home.map(|h| h.join(HOME_GUARDFILE)),
            user_config: home.map(|h| h.join(USER_CONFIG)),
        }
    }

    /// Paths for the current working directory and `$HOME`.
    pub fn from_env() -> Self {
        let cwd = env::current_dir().unwrap_or_default();
        let home = env::var_os("HOME").map(PathBuf::from);
        Self::new(&cwd, home.as_deref())
    }
}

impl Default for SearchPaths {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Inputs to a Guardfile load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Inline contents; takes precedence over every path.
    pub contents: Option<GuardfileContents>,
    /// Explicit Guardfile path.
    pub guardfile: Option<PathBuf>,
    /// Default search locations.
    pub search: SearchPaths,
}

impl LoadOptions {
    /// Options that evaluate `text` verbatim.
    pub fn inline(text: impl Into<String>, search: SearchPaths) -> Self {
        Self {
            contents: Some(GuardfileContents::Text(text.into())),
            guardfile: None,
            search,
        }
    }

    /// Options that read the Guardfile at `path`.
    pub fn path(path: impl Into<PathBuf>, search: SearchPaths) -> Self {
        Self {
            contents: None,
            guardfile: Some(path.into()),
            search,
        }
    }
}

/// Where the primary Guardfile text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    /// Inline contents.
    Inline,
    /// The explicitly requested path.
    Explicit(PathBuf),
    /// `<cwd>/Guardfile`.
    Local(PathBuf),
    /// `~/.Guardfile`.
    Home(PathBuf),
}

impl Provenance {
    /// Path of the primary source, if it was read from disk.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Inline => None,
            Self::Explicit(p) | Self::Local(p) | Self::Home(p) => Some(p),
        }
    }

    /// One-line description for the diagnostics channel.
    pub fn describe(&self) -> String {
        match self.path() {
            Some(p) => format!("Using Guardfile at {}.", p.display()),
            None => "Using inline Guardfile.".to_string(),
        }
    }
}

/// Composed Guardfile text ready for interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Origin of the primary text.
    pub provenance: Provenance,
    /// Primary text with the user override appended, if any.
    pub text: String,
    /// The user override file that was appended.
    pub user_config: Option<PathBuf>,
}

impl Source {
    /// Path of the primary source, if it was read from disk.
    pub fn path(&self) -> Option<&Path> {
        self.provenance.path()
    }
}

/// Resolve and compose the Guardfile text for `opts`.
///
/// Returns `Ok(None)` for [`GuardfileContents::Skip`].
pub fn resolve(opts: &LoadOptions) -> Result<Option<Source>, Error> {
    let (provenance, mut text) = match (&opts.contents, &opts.guardfile) {
        (Some(GuardfileContents::Skip), _) => {
            debug!("guardfile evaluation skipped");
            return Ok(None);
        }
        (Some(GuardfileContents::Text(text)), _) => (Provenance::Inline, text.clone()),
        (None, Some(path)) => {
            if !path.exists() {
                return Err(Error::NotFound {
                    path: Some(path.clone()),
                });
            }
            (Provenance::Explicit(path.clone()), read(path)?)
        }
        (None, None) => search(&opts.search)?,
    };

    let user_config = match &opts.search.user_config {
        Some(path) if path.exists() => {
            let extra = read(path)?;
            text.push('\n');
            text.push_str(&extra);
            Some(path.clone())
        }
        _ => None,
    };

    debug!(
        provenance = ?provenance,
        user_config = ?user_config,
        bytes = text.len(),
        "guardfile resolved"
    );
    Ok(Some(Source {
        provenance,
        text,
        user_config,
    }))
}

/// Search the default locations in order; first existing wins.
fn search(paths: &SearchPaths) -> Result<(Provenance, String), Error> {
    if paths.local.exists() {
        return Ok((Provenance::Local(paths.local.clone()), read(&paths.local)?));
    }
    if let Some(home) = &paths.home
        && home.exists()
    {
        return Ok((Provenance::Home(home.clone()), read(home)?));
    }
    Err(Error::NotFound { path: None })
}

/// Read a whole file, mapping failures to [`Error::Read`].
fn read(path: &Path) -> Result<String, Error> {
    fs::read_to_string(path).map_err(|e| Error::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
