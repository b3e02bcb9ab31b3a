use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::configuration::camera_config::CameraConfig;
use crate::configuration::types::RecorderSettings;

/// Program and arguments of the recording subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<OsString>,
}

impl CommandSpec {
    pub fn new<I, A>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Segmenting capture of the camera device into daily folders.
    pub fn ffmpeg(camera: &CameraConfig, settings: &RecorderSettings) -> Self {
        let framerate = settings.framerate.to_string();
        let segment_time = settings.segment_seconds.to_string();
        let output = segment_pattern(&camera.recording_clips_dir, &settings.container);

        let mut args: Vec<OsString> = [
            "-nostdin",
            "-f",
            settings.input_format.as_str(),
            "-framerate",
            framerate.as_str(),
            "-video_size",
            settings.video_size.as_str(),
            "-i",
            camera.camera_url.as_str(),
            "-c:v",
            settings.video_codec.as_str(),
            "-pix_fmt",
            settings.pixel_format.as_str(),
            "-b:v",
            settings.bitrate.as_str(),
            "-f",
            "segment",
            "-reset_timestamps",
            "1",
            "-segment_time",
            segment_time.as_str(),
            "-segment_format",
            settings.container.as_str(),
            "-segment_atclocktime",
            "1",
            "-strftime",
            "1",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(output.into_os_string());

        Self {
            program: settings.program.clone(),
            args,
        }
    }

    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }

    /// Shell-like rendering for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().map(|a| a.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// `strftime` output pattern: `<clips>/%Y%m%d/%Y%m%dT%H%M%S.<container>`.
pub fn segment_pattern(clips_dir: &Path, container: &str) -> PathBuf {
    clips_dir
        .join("%Y%m%d")
        .join(format!("%Y%m%dT%H%M%S.{}", container))
}
