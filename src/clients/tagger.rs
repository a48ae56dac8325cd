//! Tag writing for downloaded mp3 files.
//!
//! Uses lofty so a payload that is not audio at all is caught here
//! instead of being tagged blindly.

use std::path::Path;

use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Accessor, Tag, TagExt};

use crate::clients::{
    entities::Artists,
    errors::{Error, Result},
};

/// Descriptive fields written into the file.
#[derive(Debug, Clone, Copy)]
pub struct TrackTags<'a> {
    pub title: &'a str,
    pub artists: &'a Artists,
    pub album: &'a str,
    /// Front cover, JPEG. Skipped when empty.
    pub cover: &'a [u8],
}

/// Write `tags` into the audio file at `path`, overwriting any previous values.
///
/// Blocking; call from `spawn_blocking` inside async code.
pub fn embed(path: &Path, tags: &TrackTags<'_>) -> Result<()> {
    let corrupt = |reason: String| Error::CorruptArtifact {
        path: path.to_path_buf(),
        reason,
    };

    // detect the format from content; downloads are tagged under a `.part` name
    let mut tagged_file = Probe::open(path)
        .map_err(|e| corrupt(e.to_string()))?
        .guess_file_type()
        .map_err(|e| corrupt(e.to_string()))?
        .read()
        .map_err(|e| corrupt(e.to_string()))?;

    let tag_type = tagged_file.primary_tag_type();
    if tagged_file.tag(tag_type).is_none() {
        tagged_file.insert_tag(Tag::new(tag_type));
    }
    let tag = tagged_file
        .tag_mut(tag_type)
        .ok_or_else(|| corrupt(format!("no {tag_type:?} tag after insertion")))?;

    if !tags.cover.is_empty() {
        tag.remove_picture_type(PictureType::CoverFront);
        tag.push_picture(Picture::new_unchecked(
            PictureType::CoverFront,
            Some(MimeType::Jpeg),
            None,
            tags.cover.to_vec(),
        ));
    }
    tag.set_artist(tags.artists.display());
    tag.set_album(tags.album.to_string());
    tag.set_title(tags.title.to_string());

    tag.save_to_path(path, WriteOptions::default())
        .map_err(|e| corrupt(e.to_string()))
}
