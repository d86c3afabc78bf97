//! Rebuilds a pinned message as an ordered list of relay posts.
//!
//! Text is split into the fewest segments that fit the content limit.
//! Re-uploadable attachments are grouped by the per-post attachment limit.
//! Segments and groups are then paired by position. Attachments that are
//! too large, or animated images that must not be re-hosted, become bare
//! links in the text instead. The last post always links back to the
//! original message.

use futures_util::future::try_join_all;

use crate::relay_platform::{PlatformResult, RelayPlatform};
use crate::relay_types::{
    LinkButton, RelayFile, RelayLimits, RelayPost, SourceAttachment, SourceMessage,
};

const LINK_ONLY_EXTENSIONS: &[&str] = &["gif"];

#[derive(Debug, Clone, PartialEq)]
/// One relay post before its attachment bytes are downloaded.
pub struct RelayPostPlan {
    pub content: Option<String>,
    pub attachments: Vec<SourceAttachment>,
    pub original_link: Option<LinkButton>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelayPlan {
    pub posts: Vec<RelayPostPlan>,
}

impl RelayPlan {
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

/// Decides whether an attachment is re-uploaded or replaced by its link.
pub fn should_reupload(attachment: &SourceAttachment, max_upload_bytes: u64) -> bool {
    if attachment.size > max_upload_bytes {
        return false;
    }
    match attachment.extension() {
        Some(extension) => !LINK_ONLY_EXTENSIONS.contains(&extension.as_str()),
        None => true,
    }
}

/// Plans the relay posts for `message`.
///
/// `max_upload_bytes` is the upload limit of the source guild, or the
/// global default for messages outside a guild.
pub fn reconstruct(
    message: &SourceMessage,
    max_upload_bytes: u64,
    limits: &RelayLimits,
) -> RelayPlan {
    let mut text = message.content.clone();
    let mut uploads = Vec::new();
    for attachment in &message.attachments {
        if should_reupload(attachment, max_upload_bytes) {
            uploads.push(attachment.clone());
        } else {
            push_line(&mut text, attachment.bare_url());
        }
    }
    for sticker in &message.stickers {
        push_line(&mut text, &sticker.image_url);
    }

    let segments = split_text(&text, limits.max_content_chars);
    let groups = group_attachments(&uploads, limits.max_attachments_per_post);
    let post_count = segments.len().max(groups.len());

    let mut segments = segments.into_iter();
    let mut groups = groups.into_iter();
    let posts = (0..post_count)
        .map(|index| RelayPostPlan {
            content: segments.next(),
            attachments: groups.next().unwrap_or_default(),
            original_link: (index + 1 == post_count)
                .then(|| LinkButton::original_message(message.jump_url())),
        })
        .collect();
    RelayPlan { posts }
}

fn push_line(text: &mut String, line: &str) {
    if !text.is_empty() {
        text.push('\n');
    }
    text.push_str(line);
}

/// Splits `text` into the minimum number of segments of at most `max_chars`
/// characters.
///
/// Within that minimum, each cut prefers the last newline in range, then the
/// last whitespace, then the hard limit. Separators stay with the earlier
/// segment and nothing is trimmed, so concatenating the segments reproduces
/// `text` exactly.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let max_chars = max_chars.max(1);
    let chars = text.chars().collect::<Vec<_>>();
    let mut segments = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let remaining = chars.len() - start;
        if remaining <= max_chars {
            segments.push(chars[start..].iter().collect());
            break;
        }
        // Segments still required for the rest of the text. A cut may not
        // leave more than (budget - 1) full segments behind.
        let budget = remaining.div_ceil(max_chars);
        let shortest = remaining - (budget - 1) * max_chars;
        let window = &chars[start..start + max_chars];
        let length = last_cut_after(window, shortest, |ch| ch == '\n')
            .or_else(|| last_cut_after(window, shortest, char::is_whitespace))
            .unwrap_or(max_chars);
        segments.push(chars[start..start + length].iter().collect());
        start += length;
    }
    segments
}

fn last_cut_after(
    window: &[char],
    shortest: usize,
    is_separator: impl Fn(char) -> bool,
) -> Option<usize> {
    (shortest..=window.len())
        .rev()
        .find(|length| is_separator(window[length - 1]))
}

/// Partitions `items` into consecutive groups of at most `max_per_group`.
pub fn group_attachments<T: Clone>(items: &[T], max_per_group: usize) -> Vec<Vec<T>> {
    items
        .chunks(max_per_group.max(1))
        .map(<[T]>::to_vec)
        .collect()
}

/// Downloads the attachments of one planned post.
///
/// Downloads run concurrently but files keep their planned order. A failed
/// download fails only this post.
pub async fn materialize(
    plan: &RelayPostPlan,
    platform: &dyn RelayPlatform,
) -> PlatformResult<RelayPost> {
    let downloads = plan.attachments.iter().map(|attachment| async move {
        let bytes = platform.fetch_bytes(&attachment.url).await?;
        Ok(RelayFile::from_attachment(attachment, bytes))
    });
    let files = try_join_all(downloads).await?;
    Ok(RelayPost {
        content: plan.content.clone(),
        files,
        original_link: plan.original_link.clone(),
    })
}
