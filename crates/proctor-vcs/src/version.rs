use crate::types::TagRef;

/// Number of HEAD hash characters appended to a synthesized version.
pub const SHORT_HASH_LEN: usize = 8;

/// Picks the tag whose commit was committed last. Ties keep the tag seen first.
pub fn select_latest_tag<I>(tags: I) -> Option<TagRef>
where
    I: IntoIterator<Item = TagRef>,
{
    let mut latest: Option<TagRef> = None;
    for tag in tags {
        match &latest {
            Some(current) if tag.committed_at <= current.committed_at => {}
            _ => latest = Some(tag),
        }
    }
    latest
}

/// Builds the version string for HEAD `distance` commits after `tag`.
///
/// `v1.0.1` one commit ahead becomes `v1.0.1-1+2bce182a`. A tag that already
/// contains `-` gets `.` as separator instead: `v2.0.0-rc1.3+2bce182a`.
pub fn synthesize_version(tag: &str, distance: usize, head: &str) -> String {
    if tag.is_empty() || distance == 0 {
        return tag.to_string();
    }
    let sep = if tag.contains('-') { '.' } else { '-' };
    let short = head.get(..SHORT_HASH_LEN).unwrap_or(head);
    format!("{tag}{sep}{distance}+{short}")
}
