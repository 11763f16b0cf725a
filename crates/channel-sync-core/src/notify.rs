use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Audio players tried in order, with their leading arguments.
const PLAYERS: [(&str, &[&str]); 4] = [("afplay", &[]), ("paplay", &[]), ("aplay", &[]), ("play", &["-q"])];

/// Something told when a run finishes.
pub trait Notifier: Send + Sync {
    fn notify(&self);
}

/// Guard that notifies when dropped, so every exit path after it is created is covered.
pub struct NotifyOnDrop<'a>(&'a dyn Notifier);

impl<'a> NotifyOnDrop<'a> {
    pub fn new(notifier: &'a dyn Notifier) -> Self {
        Self(notifier)
    }
}

impl Drop for NotifyOnDrop<'_> {
    fn drop(&mut self) {
        self.0.notify();
    }
}

/// Signals that a run finished: plays a sound file if one is configured and a
/// player is available, otherwise rings the terminal bell.
#[derive(Debug, Clone, Default)]
pub struct CompletionNotifier {
    sound_file: Option<PathBuf>,
}

impl CompletionNotifier {
    pub fn new(sound_file: Option<PathBuf>) -> Self {
        Self { sound_file }
    }

    /// First installed player and the arguments to play `sound`.
    pub fn player_command(sound: &Path) -> Option<(PathBuf, Vec<String>)> {
        PLAYERS.iter().find_map(|(player, args)| {
            let program = which::which(player).ok()?;
            let mut argv: Vec<String> = args.iter().map(|a| a.to_string()).collect();
            argv.push(sound.to_string_lossy().into_owned());
            Some((program, argv))
        })
    }

    fn play(&self) {
        if let Some(sound) = self.sound_file.as_deref().filter(|p| p.is_file()) {
            if let Some((program, args)) = Self::player_command(sound) {
                debug!(player = %program.display(), sound = %sound.display(), "Playing completion sound");
                let status = Command::new(&program)
                    .args(&args)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status();
                match status {
                    Ok(_) => return,
                    Err(e) => warn!(player = %program.display(), error = %e, "Failed to play completion sound"),
                }
            }
        } else if let Some(sound) = &self.sound_file {
            debug!(sound = %sound.display(), "Completion sound not found");
        }
        ring_bell();
    }
}

impl Notifier for CompletionNotifier {
    fn notify(&self) {
        self.play();
    }
}

fn ring_bell() {
    let mut stderr = std::io::stderr();
    let _ = stderr.write_all(b"\x07");
    let _ = stderr.flush();
}
