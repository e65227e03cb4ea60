//! Deterministic filename templating
//!
//! Turns `(episode, show)` into a destination path via a user-supplied
//! template. Pure and side-effect free: the same inputs always produce the
//! same path, which the dedup decision depends on.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::feed::{Episode, FeedInfo};
use regex::Regex;
use std::path::PathBuf;

const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d";

/// One parsed template element
#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Field {
        field: Field,
        format: Option<String>,
    },
}

/// The placeholders a template may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    ShowTitle,
    ShowSubtitle,
    ShowAuthor,
    ShowLanguage,
    EpisodeTitle,
    EpisodeSubtitle,
    EpisodeAuthor,
    EpisodePublishedTime,
    EpisodeOriginalFilename,
    EpisodeGuid,
    Ext,
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "show.title" => Self::ShowTitle,
            "show.subtitle" => Self::ShowSubtitle,
            "show.author" => Self::ShowAuthor,
            "show.language" => Self::ShowLanguage,
            "episode.title" => Self::EpisodeTitle,
            "episode.subtitle" => Self::EpisodeSubtitle,
            "episode.author" => Self::EpisodeAuthor,
            "episode.published_time" => Self::EpisodePublishedTime,
            "episode.original_filename" => Self::EpisodeOriginalFilename,
            "episode.guid" => Self::EpisodeGuid,
            "ext" => Self::Ext,
            _ => return None,
        })
    }
}

/// Renders episode destination paths from a template
///
/// Substituted values are sanitised (or slugified) individually, so a `/` in
/// the template separates directories while a `/` inside an episode title
/// does not.
pub struct FilenameFormatter {
    root: PathBuf,
    slugify: bool,
    segments: Vec<Segment>,
    unsafe_chars: Regex,
    slug_chars: Regex,
}

impl FilenameFormatter {
    /// Build a formatter from the configured template
    pub fn new(config: &Config) -> Result<Self> {
        let segments = parse_template(&config.filename_template)?;
        Ok(Self {
            root: config.archive_directory.clone(),
            slugify: config.slugify_paths,
            segments,
            // character classes mirror what most target filesystems reject
            unsafe_chars: Regex::new(r#"[/\\?%*:|"<>]"#).map_err(|e| Error::Config {
                message: e.to_string(),
                key: None,
            })?,
            slug_chars: Regex::new(r"[^A-Za-z0-9\-_\.]+").map_err(|e| Error::Config {
                message: e.to_string(),
                key: None,
            })?,
        })
    }

    /// Compute the destination path for an episode
    pub fn format(&self, episode: &Episode, feed_info: &FeedInfo) -> PathBuf {
        let mut rendered = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Field { field, format } => {
                    let value = self.field_value(*field, format.as_deref(), episode, feed_info);
                    rendered.push_str(&self.make_safe(&value));
                }
            }
        }
        self.root.join(rendered)
    }

    fn field_value(
        &self,
        field: Field,
        format: Option<&str>,
        episode: &Episode,
        feed_info: &FeedInfo,
    ) -> String {
        match field {
            Field::ShowTitle => feed_info.title.clone(),
            Field::ShowSubtitle => feed_info.subtitle.clone().unwrap_or_default(),
            Field::ShowAuthor => feed_info.author.clone().unwrap_or_default(),
            Field::ShowLanguage => feed_info.language.clone().unwrap_or_default(),
            Field::EpisodeTitle => episode.title.clone(),
            Field::EpisodeSubtitle => episode.subtitle.clone().unwrap_or_default(),
            Field::EpisodeAuthor => episode.author.clone().unwrap_or_default(),
            Field::EpisodePublishedTime => episode
                .published_time
                .format(format.unwrap_or(DEFAULT_DATETIME_FORMAT))
                .to_string(),
            Field::EpisodeOriginalFilename => episode.original_filename.clone(),
            Field::EpisodeGuid => episode.guid.clone(),
            Field::Ext => episode.ext.clone(),
        }
    }

    fn make_safe(&self, value: &str) -> String {
        if self.slugify {
            let transliterated = value
                .replace('Ü', "UE")
                .replace('ü', "ue")
                .replace('Ö', "OE")
                .replace('ö', "oe")
                .replace('Ä', "AE")
                .replace('ä', "ae");
            self.slug_chars
                .replace_all(&transliterated, "-")
                .trim_matches('-')
                .to_string()
        } else {
            self.unsafe_chars.replace_all(value, "-").to_string()
        }
    }
}

/// Validate a template without building a formatter (config-time check)
pub(crate) fn validate_template(template: &str) -> Result<()> {
    parse_template(template).map(|_| ())
}

fn parse_template(template: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '{' {
            literal.push(c);
            continue;
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }

        let mut placeholder = String::new();
        let mut closed = false;
        for inner in chars.by_ref() {
            if inner == '}' {
                closed = true;
                break;
            }
            placeholder.push(inner);
        }
        if !closed {
            return Err(Error::Config {
                message: format!("unclosed placeholder in filename template: '{{{placeholder}'"),
                key: Some("filename_template".to_string()),
            });
        }

        let (name, format) = match placeholder.split_once(':') {
            Some((name, format)) => (name, Some(format.to_string())),
            None => (placeholder.as_str(), None),
        };

        let field = Field::from_name(name).ok_or_else(|| Error::Config {
            message: format!("unknown placeholder '{{{name}}}' in filename template"),
            key: Some("filename_template".to_string()),
        })?;

        if field == Field::EpisodePublishedTime
            && let Some(format) = &format
            && chrono::format::StrftimeItems::new(format)
                .any(|item| matches!(item, chrono::format::Item::Error))
        {
            return Err(Error::Config {
                message: format!("invalid datetime format '{format}' in filename template"),
                key: Some("filename_template".to_string()),
            });
        }

        segments.push(Segment::Field { field, format });
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    Ok(segments)
}
