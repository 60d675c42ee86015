//! Canned ffprobe outputs.

use blackbox_core::probe::ProbeOutput;

/// ffprobe JSON with one video and one audio stream.
pub fn av_json(video_codec: &str, duration_secs: &str) -> String {
    format!(
        r#"{{
  "streams": [
    {{"index": 0, "codec_name": "{video_codec}", "codec_type": "video", "profile": "Main"}},
    {{"index": 1, "codec_name": "aac", "codec_type": "audio", "sample_rate": "44100"}}
  ],
  "format": {{"format_name": "mpegts", "nb_streams": 2, "duration": "{duration_secs}"}}
}}"#
    )
}

/// HEVC video + AAC audio lasting `duration_secs`.
pub fn hevc(duration_secs: &str) -> ProbeOutput {
    ProbeOutput::parse(av_json("hevc", duration_secs)).expect("fixture parses")
}

/// H.264 video + AAC audio lasting `duration_secs`.
pub fn h264(duration_secs: &str) -> ProbeOutput {
    ProbeOutput::parse(av_json("h264", duration_secs)).expect("fixture parses")
}

/// A lone audio stream: wrong stream count and no video.
#[allow(dead_code)]
pub fn audio_only(duration_secs: &str) -> ProbeOutput {
    let raw = format!(
        r#"{{
  "streams": [{{"index": 0, "codec_name": "aac", "codec_type": "audio"}}],
  "format": {{"duration": "{duration_secs}"}}
}}"#
    );
    ProbeOutput::parse(raw).expect("fixture parses")
}
