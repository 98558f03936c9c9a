//! Audio cues for keystrokes, mistakes and finished exercises.

use std::collections::HashMap;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Sound {
    Keypress,
    Error,
    Complete,
}

impl Sound {
    pub fn file_name(&self) -> &'static str {
        match self {
            Sound::Keypress => "keypress.mp3",
            Sound::Error => "error.mp3",
            Sound::Complete => "level_complete.mp3",
        }
    }
}

pub trait AudioSink: Send {
    fn play(&mut self, sound: Sound, volume: f32) -> io::Result<()>;
}

/// Plays nothing
#[derive(Debug, Default)]
pub struct SilentSink;

impl AudioSink for SilentSink {
    fn play(&mut self, _sound: Sound, _volume: f32) -> io::Result<()> {
        Ok(())
    }
}

/// Rings the terminal bell for mistakes and completions. Keypresses stay
/// quiet; a bell per character is unbearable.
#[derive(Debug, Default)]
pub struct TerminalBell;

impl AudioSink for TerminalBell {
    fn play(&mut self, sound: Sound, _volume: f32) -> io::Result<()> {
        if sound == Sound::Keypress {
            return Ok(());
        }
        let mut out = io::stdout();
        out.write_all(b"\x07")?;
        out.flush()
    }
}

/// Spawns an external player (`paplay`, `afplay`, ...) on the sound files in
/// `sounds_dir`. Each play is a fresh process, so rapid repeats overlap.
///
/// Player arguments may use these placeholders:
/// - `{file}`: the sound file; appended last when no argument names it
/// - `{volume}`: volume between 0 and 1, e.g. `afplay -v {volume}`
/// - `{percent}`: volume between 0 and 100, e.g. `mpv --volume={percent}`
#[derive(Debug)]
pub struct CommandSink {
    player: String,
    args: Vec<String>,
    sounds_dir: PathBuf,
    resolved: HashMap<Sound, PathBuf>,
}

impl CommandSink {
    pub fn new(player: impl Into<String>, sounds_dir: impl AsRef<Path>) -> Self {
        Self {
            player: player.into(),
            args: Vec::new(),
            sounds_dir: sounds_dir.as_ref().to_path_buf(),
            resolved: HashMap::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    fn command_args(&self, file: &Path, volume: f32) -> Vec<OsString> {
        let mut args: Vec<OsString> = self
            .args
            .iter()
            .map(|arg| {
                if arg == "{file}" {
                    file.as_os_str().to_owned()
                } else {
                    arg.replace("{volume}", &format!("{:.2}", volume))
                        .replace("{percent}", &format!("{:.0}", volume * 100.0))
                        .into()
                }
            })
            .collect();
        if !self.args.iter().any(|arg| arg == "{file}") {
            args.push(file.as_os_str().to_owned());
        }
        args
    }

    fn path_for(&mut self, sound: Sound) -> io::Result<&Path> {
        if !self.resolved.contains_key(&sound) {
            let path = self.sounds_dir.join(sound.file_name());
            if !path.is_file() {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("missing sound file {}", path.display()),
                ));
            }
            self.resolved.insert(sound, path);
        }
        Ok(&self.resolved[&sound])
    }
}

impl AudioSink for CommandSink {
    fn play(&mut self, sound: Sound, volume: f32) -> io::Result<()> {
        let path = self.path_for(sound)?.to_path_buf();
        let mut child = Command::new(&self.player)
            .args(self.command_args(&path, volume))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        // reap in the background so finished players don't linger
        std::thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }
}

pub struct AudioFeedback {
    pub enabled: bool,
    pub volume: f32,
    sink: Box<dyn AudioSink>,
}

impl std::fmt::Debug for AudioFeedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioFeedback")
            .field("enabled", &self.enabled)
            .field("volume", &self.volume)
            .finish()
    }
}

impl AudioFeedback {
    pub fn new(enabled: bool, volume: f32, sink: Box<dyn AudioSink>) -> Self {
        Self {
            enabled,
            volume: volume.clamp(0.0, 1.0),
            sink,
        }
    }

    pub fn silent() -> Self {
        Self::new(false, 0.0, Box::new(SilentSink))
    }

    pub fn play(&mut self, sound: Sound) {
        if !self.enabled || self.volume <= 0.0 {
            return;
        }
        // failing to play a cue is never worth interrupting the user for
        if let Err(err) = self.sink.play(sound, self.volume) {
            debug!(%sound, error = %err, "could not play sound");
        }
    }

    /// Flip audio on or off and return the new state
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Sink that remembers what it was asked to play
    #[derive(Clone, Default)]
    pub struct RecordingSink {
        pub played: Arc<Mutex<Vec<Sound>>>,
    }

    impl AudioSink for RecordingSink {
        fn play(&mut self, sound: Sound, _volume: f32) -> io::Result<()> {
            self.played.lock().unwrap().push(sound);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;

    struct FailingSink;

    impl AudioSink for FailingSink {
        fn play(&mut self, _sound: Sound, _volume: f32) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "no audio device"))
        }
    }

    #[test]
    fn test_play_when_enabled() {
        let sink = RecordingSink::default();
        let played = sink.played.clone();
        let mut audio = AudioFeedback::new(true, 0.5, Box::new(sink));

        audio.play(Sound::Keypress);
        audio.play(Sound::Complete);

        assert_eq!(*played.lock().unwrap(), vec![Sound::Keypress, Sound::Complete]);
    }

    #[test]
    fn test_toggle_mutes() {
        let sink = RecordingSink::default();
        let played = sink.played.clone();
        let mut audio = AudioFeedback::new(true, 0.5, Box::new(sink));

        assert!(!audio.toggle());
        audio.play(Sound::Error);
        assert!(played.lock().unwrap().is_empty());

        assert!(audio.toggle());
        audio.play(Sound::Error);
        assert_eq!(*played.lock().unwrap(), vec![Sound::Error]);
    }

    #[test]
    fn test_zero_volume_is_silent() {
        let sink = RecordingSink::default();
        let played = sink.played.clone();
        let mut audio = AudioFeedback::new(true, 0.0, Box::new(sink));
        audio.play(Sound::Keypress);
        assert!(played.lock().unwrap().is_empty());
    }

    #[test]
    fn test_volume_is_clamped() {
        let audio = AudioFeedback::new(true, 3.0, Box::new(SilentSink));
        assert_eq!(audio.volume, 1.0);
    }

    #[test]
    fn test_sink_failures_are_swallowed() {
        let mut audio = AudioFeedback::new(true, 0.5, Box::new(FailingSink));
        audio.play(Sound::Complete);
    }

    #[test]
    fn test_sound_file_names() {
        assert_eq!(Sound::Keypress.file_name(), "keypress.mp3");
        assert_eq!(Sound::Error.file_name(), "error.mp3");
        assert_eq!(Sound::Complete.file_name(), "level_complete.mp3");
        assert_eq!(Sound::Complete.to_string(), "complete");
    }

    #[test]
    fn test_command_sink_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CommandSink::new("true", dir.path());
        let err = sink.play(Sound::Error, 0.5).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_sink_spawns_player() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("keypress.mp3"), b"").unwrap();
        let mut sink = CommandSink::new("true", dir.path());
        sink.play(Sound::Keypress, 0.5).unwrap();
        // cached after the first lookup
        assert!(sink.resolved.contains_key(&Sound::Keypress));
    }

    #[test]
    fn test_command_args_carry_volume() {
        let file = Path::new("/sounds/error.mp3");

        let plain = CommandSink::new("paplay", "/sounds");
        assert_eq!(plain.command_args(file, 0.5), vec![OsString::from("/sounds/error.mp3")]);

        let afplay = CommandSink::new("afplay", "/sounds")
            .with_args(vec!["-v".into(), "{volume}".into(), "{file}".into()]);
        assert_eq!(
            afplay.command_args(file, 0.25),
            vec![
                OsString::from("-v"),
                OsString::from("0.25"),
                OsString::from("/sounds/error.mp3"),
            ]
        );

        let mpv = CommandSink::new("mpv", "/sounds")
            .with_args(vec!["--no-video".into(), "--volume={percent}".into()]);
        assert_eq!(
            mpv.command_args(file, 0.8),
            vec![
                OsString::from("--no-video"),
                OsString::from("--volume=80"),
                OsString::from("/sounds/error.mp3"),
            ]
        );
    }
}
