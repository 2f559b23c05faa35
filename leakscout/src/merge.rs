/// Final output files and the merge that fills them.
///
/// Every job writes an [`OutputTriple`]: a main file receiving each matched line
/// verbatim, and a users/password pair receiving the two halves of each line when a
/// separator is configured. The triple is always created up front (so a name clash
/// is reported before any scanning happens) and the pair is removed again after a
/// merge without separator.
///
/// ```text
/// <dir>/<stem>/<stem>-main.txt
/// <dir>/<stem>/<stem>-users.txt
/// <dir>/<stem>/<stem>-password.txt
/// ```
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::errors::{SearchError, SearchResult};
use crate::progress::Progress;
use crate::results::{MergeStats, ScanResult};
use crate::search::artifact::ArtifactDir;

const SUFFIXES: [&str; 3] = ["main", "users", "password"];

/// The three destination files of one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTriple {
    pub main: PathBuf,
    pub users: PathBuf,
    pub password: PathBuf,
}

impl OutputTriple {
    /// Paths for `output` without touching the filesystem
    pub fn paths_for(output: &Path) -> SearchResult<Self> {
        let stem = output
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                SearchError::config_error(format!(
                    "Output path {} has no usable file name",
                    output.display()
                ))
            })?;
        let dir = output.parent().unwrap_or(Path::new("")).join(stem);
        let [main, users, password] = SUFFIXES.map(|s| dir.join(format!("{}-{}.txt", stem, s)));
        Ok(Self {
            main,
            users,
            password,
        })
    }

    /// Directory holding the three files
    pub fn dir(&self) -> &Path {
        self.main.parent().unwrap_or(Path::new(""))
    }

    /// Creates the directory (if missing) and the three empty files.
    ///
    /// Fails with [`SearchError::AlreadyExists`] if any file is already there; files
    /// created by this call are removed again in that case.
    pub fn create(output: &Path) -> SearchResult<Self> {
        let triple = Self::paths_for(output)?;
        let dir = triple.dir();

        match fs::create_dir(dir) {
            Ok(()) => info!("Dir {} created for results", dir.display()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                info!("Dir {} already exists, proceeding", dir.display())
            }
            Err(e) => {
                return Err(match e.kind() {
                    io::ErrorKind::NotFound => SearchError::not_found(dir),
                    _ => SearchError::IoError(e),
                })
            }
        }

        let mut created: Vec<&Path> = Vec::with_capacity(3);
        for path in triple.all() {
            let result = OpenOptions::new().write(true).create_new(true).open(path);
            if let Err(e) = result {
                for done in &created {
                    let _ = fs::remove_file(done);
                }
                return Err(match e.kind() {
                    io::ErrorKind::AlreadyExists => SearchError::already_exists(path),
                    _ => SearchError::IoError(e),
                });
            }
            created.push(path);
        }

        debug!("These are the files written to: {:?}", triple.all());
        Ok(triple)
    }

    pub fn all(&self) -> [&Path; 3] {
        [&self.main, &self.users, &self.password]
    }

    /// Removes the files again after a run that never reached the merge
    pub fn discard(&self) {
        for path in self.all() {
            if let Err(e) = fs::remove_file(path) {
                if e.kind() != io::ErrorKind::NotFound {
                    debug!("Could not remove {}: {}", path.display(), e);
                }
            }
        }
    }
}

/// Writes the user and password halves of one line.
///
/// Without the separator in the line the whole line goes to the user side and the
/// password side gets an empty line, keeping both files line-aligned.
fn split_line(
    line: &[u8],
    separator: &[u8],
    users: &mut dyn Write,
    passwords: &mut dyn Write,
) -> io::Result<()> {
    let found = line
        .windows(separator.len())
        .position(|w| w == separator);

    match found {
        Some(at) => {
            users.write_all(&line[..at])?;
            users.write_all(b"\n")?;
            let password = &line[at + separator.len()..];
            passwords.write_all(password)?;
            if !password.ends_with(b"\n") {
                passwords.write_all(b"\n")?;
            }
        }
        None => {
            let user = line.strip_suffix(b"\n").unwrap_or(line);
            let user = user.strip_suffix(b"\r").unwrap_or(user);
            users.write_all(user)?;
            users.write_all(b"\n")?;
            passwords.write_all(b"\n")?;
        }
    }
    Ok(())
}

/// Optional split target of a merge
pub struct SplitStreams<'a> {
    pub separator: &'a [u8],
    pub users: &'a mut dyn Write,
    pub passwords: &'a mut dyn Write,
}

/// Concatenates artifacts into arbitrary writers, in the order given.
pub fn merge_streams(
    artifacts: &[ScanResult],
    dir: &ArtifactDir,
    main: &mut dyn Write,
    mut split: Option<SplitStreams<'_>>,
    progress: &dyn Progress,
) -> SearchResult<MergeStats> {
    if let Some(split) = &split {
        if split.separator.is_empty() {
            return Err(SearchError::config_error("Separator must not be empty"));
        }
    }

    let mut stats = MergeStats::default();
    let mut line = Vec::with_capacity(256);
    progress.start(
        if split.is_some() {
            "Writing to files"
        } else {
            "Writing to master-file"
        },
        artifacts.len() as u64,
    );

    for result in artifacts {
        let mut reader = BufReader::new(dir.open_read(&result.artifact)?);
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            main.write_all(&line)?;
            // An unterminated last line of one source must not run into the next
            if !line.ends_with(b"\n") {
                main.write_all(b"\n")?;
            }
            if let Some(split) = split.as_mut() {
                split_line(&line, split.separator, split.users, split.passwords)?;
            }
            stats.lines += 1;
        }
        stats.artifacts += 1;
        progress.advance();
    }
    progress.finish();

    main.flush()?;
    if let Some(split) = split.as_mut() {
        split.users.flush()?;
        split.passwords.flush()?;
    }
    Ok(stats)
}

/// Merges all artifacts into `triple`.
///
/// With a separator the users/password files are filled alongside the main file;
/// without one they are deleted afterwards. Deleting tolerates files that are
/// already gone, so merging again into the same triple is harmless.
pub fn merge(
    artifacts: &[ScanResult],
    dir: &ArtifactDir,
    triple: &OutputTriple,
    separator: Option<&[u8]>,
    progress: &dyn Progress,
) -> SearchResult<MergeStats> {
    let open = |path: &Path| -> SearchResult<BufWriter<File>> {
        Ok(BufWriter::new(
            OpenOptions::new().append(true).create(true).open(path)?,
        ))
    };

    let mut main = open(&triple.main)?;
    let stats = match separator {
        Some(separator) => {
            let mut users = open(&triple.users)?;
            let mut passwords = open(&triple.password)?;
            merge_streams(
                artifacts,
                dir,
                &mut main,
                Some(SplitStreams {
                    separator,
                    users: &mut users,
                    passwords: &mut passwords,
                }),
                progress,
            )?
        }
        None => {
            let stats = merge_streams(artifacts, dir, &mut main, None, progress)?;
            for path in [&triple.users, &triple.password] {
                match fs::remove_file(path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
            stats
        }
    };

    info!(
        "Merged {} lines from {} artifacts into {}",
        stats.lines,
        stats.artifacts,
        triple.main.display()
    );
    Ok(stats)
}
