//! Playback through an external command-line player.

use std::env;
use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::traits::{AudioError, PlaybackBackend};

/// A player program and the arguments that precede the file path.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlayerCommand {
    pub program: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub args: Vec<String>,
}

impl PlayerCommand {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Players probed in order when nothing is configured.
    pub fn defaults() -> Vec<PlayerCommand> {
        vec![
            PlayerCommand::new("afplay", &[]),
            PlayerCommand::new("aplay", &["-q"]),
            PlayerCommand::new("paplay", &[]),
            PlayerCommand::new("ffplay", &["-nodisp", "-autoexit", "-loglevel", "quiet"]),
        ]
    }

    /// Find the program on `PATH`.
    pub fn locate(&self) -> Option<PathBuf> {
        let path = env::var_os("PATH")?;
        locate_in(&self.program, &path)
    }
}

fn locate_in(program: &str, search_path: &OsStr) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }
    if program.contains(std::path::MAIN_SEPARATOR) {
        let candidate = PathBuf::from(program);
        return is_executable(&candidate).then_some(candidate);
    }
    env::split_paths(search_path)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Writes each container to a temporary file and hands it to a player.
///
/// The player runs detached. A cleanup thread deletes the file once the
/// grace period has passed, then reaps the process.
pub struct SystemPlayer {
    command: PlayerCommand,
    executable: PathBuf,
    grace: Duration,
}

impl SystemPlayer {
    /// Use the first command in `candidates` that resolves on `PATH`.
    pub fn probe(candidates: &[PlayerCommand], grace: Duration) -> Result<Self, AudioError> {
        let path = env::var_os("PATH").ok_or(AudioError::NoPlayer)?;
        Self::probe_in(candidates, &path, grace)
    }

    fn probe_in(
        candidates: &[PlayerCommand],
        search_path: &OsStr,
        grace: Duration,
    ) -> Result<Self, AudioError> {
        candidates
            .iter()
            .find_map(|command| {
                locate_in(&command.program, search_path).map(|executable| Self {
                    command: command.clone(),
                    executable,
                    grace,
                })
            })
            .ok_or(AudioError::NoPlayer)
    }

    pub fn command(&self) -> &PlayerCommand {
        &self.command
    }
}

impl PlaybackBackend for SystemPlayer {
    fn name(&self) -> &str {
        &self.command.program
    }

    fn play(&mut self, wav: &[u8]) -> Result<(), AudioError> {
        let mut file = tempfile::Builder::new()
            .prefix("sb_play_")
            .suffix(".wav")
            .tempfile()?;
        file.write_all(wav)?;
        file.flush()?;
        let (_, path) = file.keep().map_err(|e| AudioError::Io(e.error))?;

        let child = Command::new(&self.executable)
            .args(&self.command.args)
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        let child = match child {
            Ok(child) => child,
            Err(e) => {
                let _ = fs::remove_file(&path);
                return Err(e.into());
            }
        };

        clean_up_after(Played { path, child }, self.grace, |job| {
            thread::Builder::new()
                .name("sb-player-cleanup".into())
                .spawn(job)
                .map(drop)
        });
        Ok(())
    }
}

/// A kept temporary file and the player reading it.
struct Played {
    path: PathBuf,
    child: Child,
}

impl Played {
    fn remove_file(&self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::debug!("could not remove {}: {}", self.path.display(), e);
        }
    }

    /// Delete the file, then wait for the player to exit.
    fn finish(mut self) {
        self.remove_file();
        let _ = self.child.wait();
    }

    /// Delete the file now and reap the player only if it already exited.
    fn abandon(mut self) {
        self.remove_file();
        let _ = self.child.try_wait();
    }
}

type CleanupJob = Box<dyn FnOnce() + Send>;

/// Hand `played` to a job that cleans up after `grace`. When `spawn` cannot
/// start the job, the file is deleted right away instead.
fn clean_up_after<S>(played: Played, grace: Duration, spawn: S)
where
    S: FnOnce(CleanupJob) -> std::io::Result<()>,
{
    let slot = Arc::new(Mutex::new(Some(played)));
    let worker = slot.clone();
    let job: CleanupJob = Box::new(move || {
        thread::sleep(grace);
        if let Some(played) = take(&worker) {
            played.finish();
        }
    });
    if let Err(e) = spawn(job) {
        log::debug!("cleanup thread not started: {}", e);
        if let Some(played) = take(&slot) {
            played.abandon();
        }
    }
}

fn take(slot: &Mutex<Option<Played>>) -> Option<Played> {
    slot.lock().unwrap_or_else(|e| e.into_inner()).take()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[cfg(unix)]
    fn install_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    fn played_file(dir: &Path) -> Played {
        let path = dir.join("kept.wav");
        fs::write(&path, b"RIFF").unwrap();
        let child = Command::new("sh").arg("-c").arg("exit 0").spawn().unwrap();
        Played { path, child }
    }

    #[cfg(unix)]
    #[test]
    fn file_is_removed_when_cleanup_cannot_start() {
        let dir = tempfile::tempdir().unwrap();
        let played = played_file(dir.path());
        let path = played.path.clone();

        clean_up_after(played, Duration::from_secs(60), |_job| {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "out of threads"))
        });
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn cleanup_job_removes_file_after_grace() {
        let dir = tempfile::tempdir().unwrap();
        let played = played_file(dir.path());
        let path = played.path.clone();

        let mut pending = None;
        clean_up_after(played, Duration::ZERO, |job| {
            pending = Some(job);
            Ok(())
        });
        assert!(path.exists());

        (pending.unwrap())();
        assert!(!path.exists());
    }

    #[test]
    fn defaults_follow_probe_order() {
        let names: Vec<String> = PlayerCommand::defaults().into_iter().map(|c| c.program).collect();
        assert_eq!(names, ["afplay", "aplay", "paplay", "ffplay"]);
        assert_eq!(PlayerCommand::defaults()[1].args, ["-q"]);
    }

    #[test]
    fn missing_players_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let candidates = [PlayerCommand::new("definitely-not-a-player", &[])];
        let err = SystemPlayer::probe_in(&candidates, dir.path().as_os_str(), Duration::ZERO)
            .err()
            .unwrap();
        assert!(matches!(err, AudioError::NoPlayer));
    }

    #[cfg(unix)]
    #[test]
    fn probe_skips_to_first_installed_player() {
        let dir = tempfile::tempdir().unwrap();
        install_script(dir.path(), "second", "exit 0");
        fs::write(dir.path().join("not-executable"), "").unwrap();

        let candidates = [
            PlayerCommand::new("first", &[]),
            PlayerCommand::new("not-executable", &[]),
            PlayerCommand::new("second", &["-x"]),
        ];
        let player =
            SystemPlayer::probe_in(&candidates, dir.path().as_os_str(), Duration::ZERO).unwrap();
        assert_eq!(player.name(), "second");
        assert_eq!(player.command().args, ["-x"]);
    }

    #[cfg(unix)]
    #[test]
    fn player_receives_the_container() {
        let dir = tempfile::tempdir().unwrap();
        let copy = dir.path().join("heard.wav");
        install_script(dir.path(), "fakeplay", &format!("cat \"$1\" > \"{}\"", copy.display()));

        let candidates = [PlayerCommand::new("fakeplay", &[])];
        let mut player =
            SystemPlayer::probe_in(&candidates, dir.path().as_os_str(), Duration::from_millis(300))
                .unwrap();

        let wav = sb_formats::samples_to_wav(&[1, 2, 3, 4], 8_000);
        player.play(&wav).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if fs::read(&copy).map(|b| b == wav).unwrap_or(false) {
                break;
            }
            thread::sleep(Duration::from_millis(20));
        }
        assert_eq!(fs::read(&copy).unwrap(), wav);
    }
}
