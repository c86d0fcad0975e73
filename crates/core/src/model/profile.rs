// SPDX-License-Identifier: MIT

//! Encoding profiles: the small, built-in set of target renditions a job can
//! request by name.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    H264,
    Hevc,
}

crate::simple_display! {
    VideoCodec {
        H264 => "h264",
        Hevc => "hevc",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Aac,
}

crate::simple_display! {
    AudioCodec {
        Aac => "aac",
    }
}

/// A named target rendition: resolution, codecs, bitrate, and the ffmpeg
/// preset used to trade encode speed for compression efficiency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Profile {
    pub name: &'static str,
    pub video_codec: VideoCodec,
    pub audio_codec: AudioCodec,
    pub width: u32,
    pub height: u32,
    pub bitrate_kbps: u32,
    pub preset: &'static str,
    pub container: &'static str,
}

impl Profile {
    /// Look up a built-in profile by name.
    pub fn lookup(name: &str) -> Option<&'static Profile> {
        Profile::BUILTIN.iter().find(|p| p.name == name)
    }

    /// The profile used when a job is submitted with no profiles at all.
    pub fn default_builtin() -> &'static Profile {
        &Profile::BUILTIN[1]
    }

    pub const BUILTIN: &'static [Profile] = &[
        Profile {
            name: "h264_720p",
            video_codec: VideoCodec::H264,
            audio_codec: AudioCodec::Aac,
            width: 1280,
            height: 720,
            bitrate_kbps: 2500,
            preset: "veryfast",
            container: "mp4",
        },
        Profile {
            name: "h264_1080p",
            video_codec: VideoCodec::H264,
            audio_codec: AudioCodec::Aac,
            width: 1920,
            height: 1080,
            bitrate_kbps: 5000,
            preset: "veryfast",
            container: "mp4",
        },
        Profile {
            name: "hevc_1080p",
            video_codec: VideoCodec::Hevc,
            audio_codec: AudioCodec::Aac,
            width: 1920,
            height: 1080,
            bitrate_kbps: 3500,
            preset: "medium",
            container: "mp4",
        },
    ];
}

#[cfg(test)]
#[path = "profile_tests.rs"]
mod tests;
