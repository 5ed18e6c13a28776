//! Locating and normalizing separation output
//!
//! demucs writes `<root>/<model>/<track>/{vocals,no_vocals}.<ext>` where the
//! model directory depends on the demucs version and options. Older setups
//! were also seen writing `<root>/vocals/<track>/vocals.<ext>` and
//! `<root>/no_vocals/<track>/no_vocals.<ext>`. Both are accepted; the model
//! name is never assumed.

use crate::error::{describe_io_error, Result, StemcutError};
use crate::workspace::{ensure_dir, Workspace, NO_VOCALS_DIR, VOCALS_DIR};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

/// Extensions demucs can write stems in
pub const STEM_EXTENSIONS: [&str; 3] = ["wav", "flac", "mp3"];

const VOCALS_STEM: &str = "vocals";
const NO_VOCALS_STEM: &str = "no_vocals";

/// Holding directory for a previous pair while it is being replaced
const STALE_DIR: &str = ".stale";

/// A vocal/instrumental pair found under the separation root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedStems {
    pub vocals: PathBuf,
    pub no_vocals: PathBuf,
    /// Directories owned by the tool that can go once the stems are moved
    pub track_dirs: Vec<PathBuf>,
    /// Model directory, removed if it ends up empty
    pub model_dir: Option<PathBuf>,
}

impl LocatedStems {
    /// Extension shared by both stems
    pub fn extension(&self) -> &str {
        self.vocals
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("wav")
    }

    fn modified(&self) -> SystemTime {
        [&self.vocals, &self.no_vocals]
            .iter()
            .filter_map(|p| std::fs::metadata(p).and_then(|m| m.modified()).ok())
            .max()
            .unwrap_or(SystemTime::UNIX_EPOCH)
    }
}

/// Find `vocals.<ext>` in `vocals_dir` and `no_vocals.<ext>` in
/// `no_vocals_dir` sharing one extension
fn find_pair(vocals_dir: &Path, no_vocals_dir: &Path) -> Option<(PathBuf, PathBuf)> {
    STEM_EXTENSIONS.iter().find_map(|ext| {
        let vocals = vocals_dir.join(format!("{}.{}", VOCALS_STEM, ext));
        let no_vocals = no_vocals_dir.join(format!("{}.{}", NO_VOCALS_STEM, ext));
        (vocals.is_file() && no_vocals.is_file()).then_some((vocals, no_vocals))
    })
}

/// Find the stems produced for `track_base` under `root`
///
/// Every directory under `root` other than the canonical `vocals/` and
/// `no_vocals/` is treated as a model directory and probed for
/// `<track_base>/vocals.*` and `<track_base>/no_vocals.*`. The fixed
/// `vocals/<track_base>/` + `no_vocals/<track_base>/` layout is probed too.
/// When several candidates match, the most recently written wins.
pub fn locate_stems(root: &Path, track_base: &str) -> Result<LocatedStems> {
    let entries = std::fs::read_dir(root).map_err(|e| {
        StemcutError::separation(root, format!("Cannot read separation output directory: {}", e))
    })?;

    let mut candidates: Vec<LocatedStems> = Vec::new();

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name();
        if name == VOCALS_DIR || name == NO_VOCALS_DIR || name == STALE_DIR {
            continue;
        }

        let track_dir = path.join(track_base);
        if let Some((vocals, no_vocals)) = find_pair(&track_dir, &track_dir) {
            debug!("Found stems under model directory {}", path.display());
            candidates.push(LocatedStems {
                vocals,
                no_vocals,
                track_dirs: vec![track_dir],
                model_dir: Some(path),
            });
        }
    }

    let fixed_vocals_dir = root.join(VOCALS_DIR).join(track_base);
    let fixed_no_vocals_dir = root.join(NO_VOCALS_DIR).join(track_base);
    if let Some((vocals, no_vocals)) = find_pair(&fixed_vocals_dir, &fixed_no_vocals_dir) {
        debug!("Found stems in the fixed vocals/no_vocals layout");
        candidates.push(LocatedStems {
            vocals,
            no_vocals,
            track_dirs: vec![fixed_vocals_dir, fixed_no_vocals_dir],
            model_dir: None,
        });
    }

    if candidates.len() > 1 {
        warn!(
            "Found {} separation outputs for '{}', using the newest",
            candidates.len(),
            track_base
        );
    }

    candidates
        .into_iter()
        .max_by_key(LocatedStems::modified)
        .ok_or_else(|| {
            StemcutError::separation(
                root,
                format!(
                    "Separation finished but no '{}/vocals.<ext>' and '{}/no_vocals.<ext>' pair with a shared extension was found",
                    track_base, track_base
                ),
            )
        })
}

/// Canonical outputs for a name, in every extension
pub fn canonical_outputs(workspace: &Workspace, name: &str) -> Vec<PathBuf> {
    STEM_EXTENSIONS
        .iter()
        .flat_map(|ext| [workspace.vocals_path(name, ext), workspace.no_vocals_path(name, ext)])
        .collect()
}

/// Where `path` is parked while the previous outputs are cleared
fn parked_path(stale_dir: &Path, index: usize, path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    stale_dir.join(format!("{}-{}", index, file_name))
}

/// Delete any canonical output for `name`
///
/// All existing outputs are first moved aside into `separated/.stale/`. If
/// one of them cannot be moved, the ones already moved are put back, so the
/// previous pair is either removed whole or left whole.
pub fn clear_canonical_outputs(workspace: &Workspace, name: &str) -> Result<()> {
    let existing: Vec<PathBuf> = canonical_outputs(workspace, name)
        .into_iter()
        .filter(|p| p.symlink_metadata().is_ok())
        .collect();
    if existing.is_empty() {
        return Ok(());
    }

    let stale_dir = workspace.separated_dir().join(STALE_DIR);
    ensure_dir(&stale_dir).map_err(|e| {
        StemcutError::separation(
            &stale_dir,
            format!("Cannot remove previous outputs: {}", describe_io_error(&stale_dir, &e)),
        )
    })?;

    let mut parked: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(existing.len());
    for (index, path) in existing.iter().enumerate() {
        let target = parked_path(&stale_dir, index, path);
        debug!("Removing previous output {}", path.display());
        if let Err(e) = std::fs::rename(path, &target) {
            let mut reason = format!(
                "Cannot remove previous output: {}",
                describe_io_error(path, &e)
            );
            for (original, moved) in parked.iter().rev() {
                if let Err(undo) = std::fs::rename(moved, original) {
                    reason.push_str(&format!(
                        "; {} could not be restored from {}: {}",
                        original.display(),
                        moved.display(),
                        undo
                    ));
                }
            }
            return Err(StemcutError::separation(path, reason));
        }
        parked.push((path.clone(), target));
    }

    if let Err(e) = std::fs::remove_dir_all(&stale_dir) {
        warn!("Could not remove {}: {}", stale_dir.display(), e);
    }
    Ok(())
}

/// Move a located pair into the canonical layout and drop the tool's directories
///
/// Returns `(vocals, no_vocals)` paths. If the second move fails the first is
/// undone, so the canonical directories never hold half a pair.
pub fn normalize_stems(
    located: &LocatedStems,
    workspace: &Workspace,
    name: &str,
) -> Result<(PathBuf, PathBuf)> {
    let ext = located.extension().to_string();
    let vocals_target = workspace.vocals_path(name, &ext);
    let no_vocals_target = workspace.no_vocals_path(name, &ext);

    for dir in [workspace.vocals_dir(), workspace.no_vocals_dir()] {
        ensure_dir(&dir).map_err(|e| {
            StemcutError::separation(
                &dir,
                format!("Cannot create output directory: {}", describe_io_error(&dir, &e)),
            )
        })?;
    }

    std::fs::rename(&located.vocals, &vocals_target).map_err(|e| {
        StemcutError::separation(
            &located.vocals,
            format!("Failed to move vocals to {}: {}", vocals_target.display(), e),
        )
    })?;

    if let Err(e) = std::fs::rename(&located.no_vocals, &no_vocals_target) {
        let mut reason = format!(
            "Failed to move instrumental to {}: {}",
            no_vocals_target.display(),
            e
        );
        if let Err(undo) = std::fs::rename(&vocals_target, &located.vocals) {
            warn!("Could not restore {}: {}", located.vocals.display(), undo);
            if let Err(remove_err) = std::fs::remove_file(&vocals_target) {
                reason.push_str(&format!(
                    "; rollback incomplete, {} is left without its instrumental: {}",
                    vocals_target.display(),
                    remove_err
                ));
            }
        }
        return Err(StemcutError::separation(&located.no_vocals, reason));
    }

    remove_tool_dirs(located);

    Ok((vocals_target, no_vocals_target))
}

/// Remove the per-track directories and an emptied model directory
fn remove_tool_dirs(located: &LocatedStems) {
    for dir in &located.track_dirs {
        if let Err(e) = std::fs::remove_dir_all(dir) {
            warn!("Could not remove {}: {}", dir.display(), e);
        }
    }

    if let Some(model_dir) = &located.model_dir {
        // Only succeeds when no other track's output is still in there
        match std::fs::remove_dir(model_dir) {
            Ok(()) => debug!("Removed {}", model_dir.display()),
            Err(e) => debug!("Keeping {}: {}", model_dir.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path, contents: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_locate_model_directory_without_knowing_its_name() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("mdx_extra_q/song_trimmed/vocals.wav"), b"v");
        touch(&root.join("mdx_extra_q/song_trimmed/no_vocals.wav"), b"n");
        // Canonical directories from older runs are not model directories
        touch(&root.join("vocals/other_vocals.wav"), b"x");

        let located = locate_stems(root, "song_trimmed").unwrap();
        assert_eq!(located.vocals, root.join("mdx_extra_q/song_trimmed/vocals.wav"));
        assert_eq!(located.model_dir, Some(root.join("mdx_extra_q")));
        assert_eq!(located.extension(), "wav");
    }

    #[test]
    fn test_locate_fixed_layout() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("vocals/song_trimmed/vocals.flac"), b"v");
        touch(&root.join("no_vocals/song_trimmed/no_vocals.flac"), b"n");

        let located = locate_stems(root, "song_trimmed").unwrap();
        assert_eq!(located.model_dir, None);
        assert_eq!(located.extension(), "flac");
        assert_eq!(located.track_dirs.len(), 2);
    }

    #[test]
    fn test_locate_requires_both_stems() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("htdemucs/song_trimmed/vocals.wav"), b"v");

        let err = locate_stems(root, "song_trimmed").unwrap_err();
        assert!(matches!(err, StemcutError::SeparationError { .. }));
    }

    #[test]
    fn test_locate_ignores_other_tracks() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("htdemucs/another_trimmed/vocals.wav"), b"v");
        touch(&root.join("htdemucs/another_trimmed/no_vocals.wav"), b"n");

        assert!(locate_stems(root, "song_trimmed").is_err());
    }

    #[test]
    fn test_normalize_moves_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::new(dir.path());
        let root = workspace.separated_dir();
        touch(&root.join("htdemucs/song_trimmed/vocals.wav"), b"vocal data");
        touch(&root.join("htdemucs/song_trimmed/no_vocals.wav"), b"band data");

        let located = locate_stems(&root, "song_trimmed").unwrap();
        let (vocals, no_vocals) = normalize_stems(&located, &workspace, "song").unwrap();

        assert_eq!(vocals, root.join("vocals/song_vocals.wav"));
        assert_eq!(no_vocals, root.join("no_vocals/song_no_vocals.wav"));
        assert_eq!(std::fs::read(&vocals).unwrap(), b"vocal data");
        assert_eq!(std::fs::read(&no_vocals).unwrap(), b"band data");
        assert!(!root.join("htdemucs").exists());
    }

    #[test]
    fn test_normalize_keeps_shared_model_directory() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::new(dir.path());
        let root = workspace.separated_dir();
        touch(&root.join("htdemucs/song_trimmed/vocals.wav"), b"v");
        touch(&root.join("htdemucs/song_trimmed/no_vocals.wav"), b"n");
        touch(&root.join("htdemucs/other_trimmed/vocals.wav"), b"v");

        let located = locate_stems(&root, "song_trimmed").unwrap();
        normalize_stems(&located, &workspace, "song").unwrap();

        assert!(!root.join("htdemucs/song_trimmed").exists());
        assert!(root.join("htdemucs/other_trimmed/vocals.wav").exists());
    }

    #[test]
    fn test_normalize_rolls_back_on_second_move_failure() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::new(dir.path());
        let root = workspace.separated_dir();
        touch(&root.join("htdemucs/song_trimmed/vocals.wav"), b"v");
        touch(&root.join("htdemucs/song_trimmed/no_vocals.wav"), b"n");

        let located = locate_stems(&root, "song_trimmed").unwrap();
        // Instrumental vanishes between discovery and the move
        std::fs::remove_file(&located.no_vocals).unwrap();

        let err = normalize_stems(&located, &workspace, "song").unwrap_err();
        assert!(matches!(err, StemcutError::SeparationError { .. }));
        assert!(!workspace.vocals_path("song", "wav").exists());
        assert!(!workspace.no_vocals_path("song", "wav").exists());
        assert!(located.vocals.exists());
    }

    #[test]
    fn test_clear_canonical_outputs() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::new(dir.path());
        touch(&workspace.vocals_path("song", "wav"), b"old");
        touch(&workspace.no_vocals_path("song", "mp3"), b"old");
        touch(&workspace.vocals_path("keep", "wav"), b"other");

        clear_canonical_outputs(&workspace, "song").unwrap();

        assert!(!workspace.vocals_path("song", "wav").exists());
        assert!(!workspace.no_vocals_path("song", "mp3").exists());
        assert!(workspace.vocals_path("keep", "wav").exists());
    }

    #[test]
    fn test_locate_requires_a_shared_extension() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("htdemucs/song_trimmed/vocals.wav"), b"v");
        touch(&root.join("htdemucs/song_trimmed/no_vocals.flac"), b"fLaC");

        let err = locate_stems(root, "song_trimmed").unwrap_err();
        assert!(matches!(err, StemcutError::SeparationError { .. }));
    }

    #[test]
    fn test_mixed_extensions_normalize_the_matching_pair() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::new(dir.path());
        let root = workspace.separated_dir();
        touch(&root.join("htdemucs/song_trimmed/vocals.wav"), b"RIFF");
        touch(&root.join("htdemucs/song_trimmed/vocals.flac"), b"fLaC vocals");
        touch(&root.join("htdemucs/song_trimmed/no_vocals.flac"), b"fLaC band");

        let located = locate_stems(&root, "song_trimmed").unwrap();
        assert_eq!(located.extension(), "flac");

        let (vocals, no_vocals) = normalize_stems(&located, &workspace, "song").unwrap();
        assert_eq!(vocals, workspace.vocals_path("song", "flac"));
        assert_eq!(no_vocals, workspace.no_vocals_path("song", "flac"));
        assert_eq!(std::fs::read(&vocals).unwrap(), b"fLaC vocals");
        assert_eq!(std::fs::read(&no_vocals).unwrap(), b"fLaC band");
        assert!(!workspace.no_vocals_path("song", "wav").exists());
    }

    #[test]
    fn test_clear_leaves_no_holding_directory() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::new(dir.path());
        touch(&workspace.vocals_path("song", "wav"), b"old");
        touch(&workspace.no_vocals_path("song", "wav"), b"old");

        clear_canonical_outputs(&workspace, "song").unwrap();

        assert!(!workspace.separated_dir().join(STALE_DIR).exists());
    }

    #[test]
    fn test_clear_keeps_pair_whole_when_one_file_cannot_move() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::new(dir.path());
        let vocals = workspace.vocals_path("song", "wav");
        let no_vocals = workspace.no_vocals_path("song", "wav");
        touch(&vocals, b"old vocals");
        touch(&no_vocals, b"old band");

        // A non-empty directory where the instrumental would be parked
        let stale_dir = workspace.separated_dir().join(STALE_DIR);
        touch(&parked_path(&stale_dir, 1, &no_vocals).join("blocker"), b"x");

        let err = clear_canonical_outputs(&workspace, "song").unwrap_err();
        assert_eq!(err.stage(), Some(crate::types::Stage::Separated));
        assert_eq!(std::fs::read(&vocals).unwrap(), b"old vocals");
        assert_eq!(std::fs::read(&no_vocals).unwrap(), b"old band");
    }

    #[test]
    fn test_clear_failure_is_a_separation_error() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::new(dir.path());
        touch(&workspace.vocals_path("song", "wav"), b"old");
        // The holding directory cannot be created over a plain file
        touch(&workspace.separated_dir().join(STALE_DIR), b"not a directory");

        let err = clear_canonical_outputs(&workspace, "song").unwrap_err();
        assert!(matches!(err, StemcutError::SeparationError { .. }));
        assert!(workspace.vocals_path("song", "wav").exists());
    }
}
