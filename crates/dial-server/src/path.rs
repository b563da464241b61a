//! Strict DIAL-URI decomposition (spec.md §4.1).
//!
//! Splits on `/`, discards empty segments, and keeps the first four non-empty
//! segments as `{base, appName, instance, tail}`. The canonical path rebuilt from
//! those segments must equal the input (minus its leading `/`) or the request is
//! rejected outright — this is the tightened reading of the original's
//! `g_strsplit(path, "/", 4)` behavior: a request like `/apps//Netflix` or
//! `/apps/Netflix/` is malformed, not tolerated, and a fifth non-empty segment is a
//! rejection rather than text folded into `tail` (spec.md §9 OQ-2, SPEC_FULL.md §4.1).

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("request path exceeds the maximum length")]
    TooLong,
    #[error("request path does not match the DIAL grammar")]
    Malformed,
    #[error("request path is not in canonical form")]
    NotCanonical,
}

/// A path that has passed grammar validation: 2 to 4 non-empty segments, first one
/// literally `apps`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    segments: Vec<String>,
}

impl ParsedPath {
    pub fn parse(path: &str, max_uri_length: usize) -> Result<Self, PathError> {
        if path.len() >= max_uri_length {
            return Err(PathError::TooLong);
        }

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() < 2 || segments.len() > 4 {
            return Err(PathError::Malformed);
        }
        if segments[0] != "apps" {
            return Err(PathError::Malformed);
        }

        let canonical = segments.join("/");
        let input_without_leading_slash = path.strip_prefix('/').unwrap_or(path);
        if canonical != input_without_leading_slash {
            return Err(PathError::NotCanonical);
        }

        Ok(Self {
            segments: segments.into_iter().map(String::from).collect(),
        })
    }

    pub fn base(&self) -> &str {
        &self.segments[0]
    }

    pub fn app_name(&self) -> &str {
        &self.segments[1]
    }

    pub fn instance(&self) -> Option<&str> {
        self.segments.get(2).map(String::as_str)
    }

    pub fn tail(&self) -> Option<&str> {
        self.segments.get(3).map(String::as_str)
    }
}

/// The recognized URI shapes, after grammar validation (spec.md §4.4 router matrix).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathShape {
    /// `/apps/<name>`
    App { app_name: String },
    /// `/apps/system`
    System,
    /// `/apps/<name>/<instance>`
    AppInstance { app_name: String, instance: String },
    /// `/apps/<name>/dial_data`
    DialData { app_name: String },
    /// `/apps/<name>/<instance>/hide`
    Hide { app_name: String, instance: String },
}

/// Classifies a validated path into one of the recognized shapes, or `None` if the
/// segment count/tail combination is not in the matrix (caller maps that to 501).
pub fn classify(parsed: &ParsedPath) -> Option<PathShape> {
    match parsed.segments.len() {
        2 => {
            if parsed.app_name() == "system" {
                Some(PathShape::System)
            } else {
                Some(PathShape::App {
                    app_name: parsed.app_name().to_string(),
                })
            }
        }
        3 => {
            let instance = parsed.instance().expect("3 segments implies instance");
            if instance == "dial_data" {
                Some(PathShape::DialData {
                    app_name: parsed.app_name().to_string(),
                })
            } else {
                Some(PathShape::AppInstance {
                    app_name: parsed.app_name().to_string(),
                    instance: instance.to_string(),
                })
            }
        }
        4 => {
            let tail = parsed.tail().expect("4 segments implies tail");
            if tail == "hide" {
                Some(PathShape::Hide {
                    app_name: parsed.app_name().to_string(),
                    instance: parsed.instance().expect("4 segments implies instance").to_string(),
                })
            } else {
                None
            }
        }
        _ => None,
    }
}
