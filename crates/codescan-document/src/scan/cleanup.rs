// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Best-effort scan cleanup through an external deskew/despeckle filter.
//
// The working image is written to a scratch directory as a binary PGM, the
// tool (`unpaper` by default) is run over it producing a bilevel PBM, and the
// result is read back. Every failure is reported to the caller, who is
// expected to carry on with the unmodified image.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

use codescan_core::config::CleanupConfig;
use codescan_core::error::{CodescanError, Result};
use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{ExtendedColorType, GrayImage, ImageEncoder};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// How often a running tool is checked for exit and cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// An out-of-process image cleanup step.
pub trait ImageCleaner: Send + Sync {
    /// Clean `image`.
    ///
    /// Returns `Ok(None)` when cleanup is unavailable on this host (tool not
    /// installed, or disabled) and `Err` when it was attempted and failed.
    /// Either way the caller keeps using `image`, which is never modified.
    fn clean(&self, image: &GrayImage, cancel: &CancellationToken) -> Result<Option<GrayImage>>;
}

/// Cleanup through the `unpaper` command-line tool.
#[derive(Debug, Clone)]
pub struct UnpaperCleaner {
    config: CleanupConfig,
    scratch_root: Option<PathBuf>,
}

impl UnpaperCleaner {
    pub fn new(config: CleanupConfig) -> Self {
        Self {
            config,
            scratch_root: None,
        }
    }

    /// Create per-run scratch directories under `dir` instead of the system
    /// temporary directory.
    pub fn with_scratch_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(dir.into());
        self
    }

    /// The tool's resolved location, if installed.
    pub fn program(&self) -> Option<PathBuf> {
        resolve_program(&self.config.program)
    }

    fn run(
        &self,
        program: &Path,
        image: &GrayImage,
        cancel: &CancellationToken,
    ) -> Result<GrayImage> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("codescan-");
        let scratch = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        let input = scratch.path().join("in.pgm");
        let output_mask = scratch.path().join("out-%03d.pbm");
        let output = scratch.path().join("out-001.pbm");
        let stderr_log = scratch.path().join("stderr.log");

        write_pgm(&input, image)?;

        let mut command = Command::new(program);
        command
            .arg("-t")
            .arg("pbm")
            .arg("-b")
            .arg(self.config.black_threshold.to_string())
            .arg(&input)
            .arg(&output_mask)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(File::create(&stderr_log)?));
        debug!(?command, "Running cleanup tool");

        let mut child = command.spawn().map_err(|err| {
            CodescanError::Cleanup(format!("failed to start {}: {}", program.display(), err))
        })?;

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(err) => {
                    stop(&mut child);
                    return Err(CodescanError::Cleanup(format!(
                        "lost track of {}: {}",
                        program.display(),
                        err
                    )));
                }
            }
            if cancel.is_cancelled() {
                stop(&mut child);
                return Err(CodescanError::Cleanup("cancelled while running".to_string()));
            }
            if started.elapsed() >= timeout {
                stop(&mut child);
                return Err(CodescanError::Cleanup(format!(
                    "timed out after {}s",
                    self.config.timeout_secs
                )));
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        if !status.success() {
            let stderr = std::fs::read_to_string(&stderr_log).unwrap_or_default();
            return Err(CodescanError::Cleanup(format!(
                "{} exited with {}: {}",
                program.display(),
                status,
                stderr.trim()
            )));
        }

        let cleaned = image::open(&output).map_err(|err| {
            CodescanError::Cleanup(format!("unreadable output {}: {}", output.display(), err))
        })?;
        // `scratch` removes its files when dropped, on this and every early return.
        Ok(cleaned.into_luma8())
    }
}

impl ImageCleaner for UnpaperCleaner {
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn clean(&self, image: &GrayImage, cancel: &CancellationToken) -> Result<Option<GrayImage>> {
        if !self.config.enabled {
            return Ok(None);
        }
        let Some(program) = self.program() else {
            return Ok(None);
        };
        if cancel.is_cancelled() {
            return Err(CodescanError::Cleanup("cancelled before start".to_string()));
        }

        let cleaned = self.run(&program, image, cancel)?;
        info!(
            width = cleaned.width(),
            height = cleaned.height(),
            "Cleanup applied"
        );
        Ok(Some(cleaned))
    }
}

/// Kill `child` and reap it so no zombie outlives the run.
fn stop(child: &mut Child) {
    if let Err(err) = child.kill() {
        debug!(%err, "Cleanup tool already exited");
    }
    let _ = child.wait();
}

/// Encode `image` as a binary greymap.
fn write_pgm(path: &Path, image: &GrayImage) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    PnmEncoder::new(writer)
        .with_subtype(PnmSubtype::Graymap(SampleEncoding::Binary))
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::L8,
        )
        .map_err(|err| CodescanError::Cleanup(format!("failed to write PGM: {}", err)))
}

/// Locate `program`, once per process per program name.
///
/// A name containing a path separator is checked as-is; otherwise `PATH` is
/// searched. Only executable files qualify.
pub fn resolve_program(program: &str) -> Option<PathBuf> {
    static RESOLVED: OnceLock<Mutex<HashMap<String, Option<PathBuf>>>> = OnceLock::new();

    let cache = RESOLVED.get_or_init(|| Mutex::new(HashMap::new()));
    let mut cache = match cache.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    cache
        .entry(program.to_string())
        .or_insert_with(|| {
            let found = which::which(program).ok();
            match &found {
                Some(path) => info!(path = %path.display(), "Cleanup tool found"),
                None => warn!(program, "Cleanup tool not found; cleanup pass disabled"),
            }
            found
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn config(program: &str) -> CleanupConfig {
        CleanupConfig {
            program: program.to_string(),
            ..Default::default()
        }
    }

    /// Write an executable shell script named `name` into `dir`.
    #[cfg(unix)]
    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn missing_tool_is_not_an_error() {
        let cleaner = UnpaperCleaner::new(config("codescan-no-such-cleanup-tool"));
        let image = GrayImage::from_pixel(20, 20, Luma([255u8]));
        let result = cleaner.clean(&image, &CancellationToken::new()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn disabled_cleanup_skips() {
        let cleaner = UnpaperCleaner::new(CleanupConfig {
            enabled: false,
            ..Default::default()
        });
        let image = GrayImage::from_pixel(20, 20, Luma([255u8]));
        assert!(cleaner.clean(&image, &CancellationToken::new()).unwrap().is_none());
    }

    #[test]
    fn resolution_is_cached() {
        let first = resolve_program("codescan-cached-missing-tool");
        let second = resolve_program("codescan-cached-missing-tool");
        assert_eq!(first, None);
        assert_eq!(first, second);
    }

    #[cfg(unix)]
    #[test]
    fn explicit_path_is_honoured() {
        let dir = tempfile::tempdir().unwrap();
        let tool = script(dir.path(), "fake-unpaper", "exit 0");
        assert_eq!(resolve_program(tool.to_str().unwrap()), Some(tool.clone()));
        let absent = dir.path().join("absent");
        assert_eq!(resolve_program(absent.to_str().unwrap()), None);
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_file_is_not_a_tool() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain-unpaper");
        std::fs::write(&plain, b"#!/bin/sh\nexit 0\n").unwrap();
        assert_eq!(resolve_program(plain.to_str().unwrap()), None);
    }

    #[cfg(unix)]
    #[test]
    fn path_search_skips_non_executable_entries() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(first.path().join("codescan-shadowed"), b"").unwrap();
        let real = script(second.path(), "codescan-shadowed", "exit 0");

        let paths = std::env::join_paths([first.path(), second.path()]).unwrap();
        let found = which::which_in("codescan-shadowed", Some(paths), first.path()).unwrap();
        assert_eq!(found, real);
    }

    #[test]
    fn pgm_is_written_and_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.pgm");
        let mut image = GrayImage::from_pixel(9, 5, Luma([200u8]));
        image.put_pixel(4, 2, Luma([7u8]));
        write_pgm(&path, &image).unwrap();

        let header = std::fs::read(&path).unwrap();
        assert!(header.starts_with(b"P5"));
        let back = image::open(&path).unwrap().into_luma8();
        assert_eq!(back, image);
    }

    #[cfg(unix)]
    #[test]
    fn failing_tool_reports_cleanup_error() {
        // `false` ignores its arguments and exits non-zero.
        let Ok(program) = which::which("false") else {
            return;
        };
        let cleaner = UnpaperCleaner::new(config(program.to_str().unwrap()));
        let image = GrayImage::from_pixel(20, 20, Luma([255u8]));
        let result = cleaner.clean(&image, &CancellationToken::new());
        assert!(matches!(result, Err(CodescanError::Cleanup(_))));
    }

    #[cfg(unix)]
    #[test]
    fn tool_without_output_reports_cleanup_error() {
        // `true` exits zero but writes nothing back.
        let Ok(program) = which::which("true") else {
            return;
        };
        let cleaner = UnpaperCleaner::new(config(program.to_str().unwrap()));
        let image = GrayImage::from_pixel(20, 20, Luma([255u8]));
        let result = cleaner.clean(&image, &CancellationToken::new());
        assert!(matches!(result, Err(CodescanError::Cleanup(_))));
    }

    #[cfg(unix)]
    #[test]
    fn cancelled_before_start_fails_softly() {
        let dir = tempfile::tempdir().unwrap();
        let tool = script(dir.path(), "fake-unpaper", "exit 0");
        let cleaner = UnpaperCleaner::new(config(tool.to_str().unwrap()));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let image = GrayImage::from_pixel(20, 20, Luma([255u8]));
        assert!(matches!(
            cleaner.clean(&image, &cancel),
            Err(CodescanError::Cleanup(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn cancellation_kills_running_tool() {
        let tools = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let tool = script(tools.path(), "slow-unpaper", "exec sleep 30");
        let cleaner = UnpaperCleaner::new(config(tool.to_str().unwrap()))
            .with_scratch_root(scratch.path());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(200));
            trigger.cancel();
        });

        let image = GrayImage::from_pixel(20, 20, Luma([255u8]));
        let started = Instant::now();
        let result = cleaner.clean(&image, &cancel);
        canceller.join().unwrap();

        assert!(matches!(result, Err(CodescanError::Cleanup(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn slow_tool_is_killed_at_timeout() {
        let tools = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let tool = script(tools.path(), "slow-unpaper", "exec sleep 30");
        let cleaner = UnpaperCleaner::new(CleanupConfig {
            timeout_secs: 1,
            ..config(tool.to_str().unwrap())
        })
        .with_scratch_root(scratch.path());

        let image = GrayImage::from_pixel(20, 20, Luma([255u8]));
        let started = Instant::now();
        let result = cleaner.clean(&image, &CancellationToken::new());

        match result {
            Err(CodescanError::Cleanup(message)) => assert!(message.contains("timed out")),
            other => panic!("expected a timeout, got {:?}", other.map(|_| ())),
        }
        assert!(started.elapsed() >= Duration::from_secs(1));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }
}
