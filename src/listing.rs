//! Listing engine: prefix filtering, delimiter grouping, and pagination.
//!
//! S3 listing semantics are shared by every backend: the backends fetch
//! candidate rows in key order and hand them to the pure functions below,
//! which synthesize common prefixes, merge objects and prefixes in one
//! lexicographic order, and compute truncation and the resume token.

use crate::models::{MultipartUpload, Object, Part};

/// Page size used when the caller supplies a non-positive maximum, and the
/// hard cap applied above it.
pub const DEFAULT_MAX_KEYS: i32 = 1000;

/// Parameters for object listing. `resume_after` unifies the V1 marker and
/// V2 continuation-token semantics: results strictly greater than it.
#[derive(Clone, Debug, Default)]
pub struct ListObjectsParams {
    pub prefix: Option<String>,
    pub delimiter: Option<String>,
    pub resume_after: Option<String>,
    pub max_keys: i32,
}

/// One page of object listing results.
#[derive(Debug, Default)]
pub struct ListObjectsResult {
    pub objects: Vec<Object>,
    pub common_prefixes: Vec<String>,
    pub is_truncated: bool,
    /// Resume token for the next page; set only when truncated.
    pub next_resume_token: Option<String>,
    pub key_count: usize,
}

/// Parameters for part listing within one upload.
#[derive(Clone, Debug, Default)]
pub struct ListPartsParams {
    /// Results start strictly after this part number.
    pub part_number_marker: Option<i32>,
    pub max_parts: i32,
}

/// One page of part listing results.
#[derive(Debug, Default)]
pub struct ListPartsResult {
    pub parts: Vec<Part>,
    pub is_truncated: bool,
    pub next_part_number_marker: Option<i32>,
}

/// Parameters for listing in-progress multipart uploads in a bucket.
/// The marker is the (key, upload id) pair of the last upload returned;
/// the upload id breaks ties between uploads targeting the same key.
#[derive(Clone, Debug, Default)]
pub struct ListUploadsParams {
    pub prefix: Option<String>,
    pub key_marker: Option<String>,
    pub upload_id_marker: Option<String>,
    pub max_uploads: i32,
}

/// One page of upload listing results.
#[derive(Debug, Default)]
pub struct ListUploadsResult {
    pub uploads: Vec<MultipartUpload>,
    pub is_truncated: bool,
    pub next_key_marker: Option<String>,
    pub next_upload_id_marker: Option<String>,
}

/// Normalize a caller-supplied page size: non-positive means the default,
/// anything above the default is capped at it.
pub fn normalize_max_keys(max_keys: i32) -> usize {
    if max_keys <= 0 {
        DEFAULT_MAX_KEYS as usize
    } else {
        max_keys.min(DEFAULT_MAX_KEYS) as usize
    }
}

/// Page assembly without a delimiter. `rows` must be in ascending key order
/// and fetched with a `max + 1` limit so truncation is detectable.
pub(crate) fn paginate_plain(mut rows: Vec<Object>, max: usize) -> ListObjectsResult {
    let is_truncated = rows.len() > max;
    rows.truncate(max);
    let next_resume_token = if is_truncated {
        rows.last().map(|o| o.key.clone())
    } else {
        None
    };
    let key_count = rows.len();
    ListObjectsResult {
        objects: rows,
        common_prefixes: Vec::new(),
        is_truncated,
        next_resume_token,
        key_count,
    }
}

/// Page assembly with a delimiter. `rows` must be the *full* candidate set
/// (prefix-filtered, strictly after the marker, ascending by key): grouping
/// can collapse arbitrarily many keys into one common prefix, so a bounded
/// fetch cannot decide truncation correctly.
pub(crate) fn group_and_truncate(
    rows: Vec<Object>,
    prefix: Option<&str>,
    delimiter: &str,
    resume_after: Option<&str>,
    max: usize,
) -> ListObjectsResult {
    enum Entry {
        Object(Box<Object>),
        CommonPrefix(String),
    }

    impl Entry {
        fn key(&self) -> &str {
            match self {
                Entry::Object(o) => &o.key,
                Entry::CommonPrefix(p) => p,
            }
        }
    }

    let mut entries: Vec<Entry> = Vec::new();
    let mut last_prefix: Option<String> = None;
    for obj in rows {
        match common_prefix_of(&obj.key, prefix, delimiter) {
            Some(group) => {
                // Rows arrive in key order, so repeats of one group are adjacent.
                if last_prefix.as_deref() == Some(group.as_str()) {
                    continue;
                }
                // A group at or below the marker was fully represented by the
                // page that emitted it; continuation must not repeat it.
                if resume_after.is_some_and(|marker| group.as_str() <= marker) {
                    continue;
                }
                last_prefix = Some(group.clone());
                entries.push(Entry::CommonPrefix(group));
            }
            None => entries.push(Entry::Object(Box::new(obj))),
        }
    }

    // Clients expect truncation to reflect the true combined lexicographic
    // boundary, so objects and synthesized prefixes page as one sequence.
    entries.sort_by(|a, b| a.key().cmp(b.key()));

    let is_truncated = entries.len() > max;
    entries.truncate(max);
    let next_resume_token = if is_truncated {
        entries.last().map(|e| e.key().to_string())
    } else {
        None
    };

    let mut objects = Vec::new();
    let mut common_prefixes = Vec::new();
    for entry in entries {
        match entry {
            Entry::Object(o) => objects.push(*o),
            Entry::CommonPrefix(p) => common_prefixes.push(p),
        }
    }
    let key_count = objects.len() + common_prefixes.len();

    ListObjectsResult {
        objects,
        common_prefixes,
        is_truncated,
        next_resume_token,
        key_count,
    }
}

/// Compute the synthesized common prefix for a key, if the delimiter occurs
/// after the requested prefix: `prefix` plus everything up to and including
/// the first delimiter occurrence.
pub(crate) fn common_prefix_of(
    key: &str,
    requested_prefix: Option<&str>,
    delimiter: &str,
) -> Option<String> {
    let prefix = requested_prefix.unwrap_or("");
    let remainder = key.strip_prefix(prefix)?;
    let pos = remainder.find(delimiter)?;
    let mut combined = String::with_capacity(prefix.len() + pos + delimiter.len());
    combined.push_str(prefix);
    combined.push_str(&remainder[..pos + delimiter.len()]);
    Some(combined)
}

/// Generic `max + 1` truncation for part and upload listings.
pub(crate) fn truncate_page<T>(mut rows: Vec<T>, max: usize) -> (Vec<T>, bool) {
    let is_truncated = rows.len() > max;
    rows.truncate(max);
    (rows, is_truncated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Acl;
    use crate::timefmt;

    fn obj(key: &str) -> Object {
        Object {
            bucket: "b".into(),
            key: key.into(),
            size: 0,
            etag: "etag".into(),
            content_type: None,
            content_encoding: None,
            content_language: None,
            content_disposition: None,
            cache_control: None,
            expires: None,
            storage_class: "STANDARD".into(),
            acl: Acl::default(),
            metadata: Default::default(),
            last_modified: timefmt::now_millis(),
            delete_marker: false,
        }
    }

    fn objs(keys: &[&str]) -> Vec<Object> {
        keys.iter().map(|k| obj(k)).collect()
    }

    #[test]
    fn max_keys_normalization() {
        assert_eq!(normalize_max_keys(0), 1000);
        assert_eq!(normalize_max_keys(-5), 1000);
        assert_eq!(normalize_max_keys(2), 2);
        assert_eq!(normalize_max_keys(5000), 1000);
    }

    #[test]
    fn common_prefix_synthesis() {
        assert_eq!(
            common_prefix_of("x/1", Some("x/"), "/"),
            None,
            "no delimiter after the prefix means a plain object"
        );
        assert_eq!(
            common_prefix_of("x/a/1", Some("x/"), "/"),
            Some("x/a/".into())
        );
        assert_eq!(common_prefix_of("x/a/1", None, "/"), Some("x/".into()));
        assert_eq!(common_prefix_of("y/1", Some("x/"), "/"), None);
        assert_eq!(
            common_prefix_of("a--b--c", None, "--"),
            Some("a--".into()),
            "multi-character delimiters group on the first occurrence"
        );
    }

    #[test]
    fn plain_pagination_detects_truncation() {
        // Three rows fetched for max = 2 means one more page exists.
        let page = paginate_plain(objs(&["a", "b", "c"]), 2);
        assert_eq!(page.key_count, 2);
        assert!(page.is_truncated);
        assert_eq!(page.next_resume_token.as_deref(), Some("b"));

        let page = paginate_plain(objs(&["a", "b"]), 2);
        assert!(!page.is_truncated);
        assert!(page.next_resume_token.is_none());
    }

    #[test]
    fn empty_candidates_yield_empty_untruncated_page() {
        let page = paginate_plain(Vec::new(), 10);
        assert!(page.objects.is_empty());
        assert!(!page.is_truncated);

        let page = group_and_truncate(Vec::new(), Some("x/"), "/", None, 10);
        assert_eq!(page.key_count, 0);
        assert!(!page.is_truncated);
    }

    #[test]
    fn delimiter_grouping_dedupes_prefixes() {
        let page = group_and_truncate(objs(&["x/1", "x/2", "y/1", "z"]), None, "/", None, 10);
        assert_eq!(page.common_prefixes, vec!["x/", "y/"]);
        assert_eq!(page.objects.len(), 1);
        assert_eq!(page.objects[0].key, "z");
        assert!(!page.is_truncated);
    }

    #[test]
    fn truncation_merges_objects_and_prefixes_by_key_order() {
        // Combined order is a!, a/, b, c/ — a page of 3 must cut at "b",
        // not return all objects first.
        let rows = objs(&["a!", "a/1", "a/2", "b", "c/1"]);
        let page = group_and_truncate(rows, None, "/", None, 3);
        assert_eq!(
            page.objects.iter().map(|o| o.key.as_str()).collect::<Vec<_>>(),
            vec!["a!", "b"]
        );
        assert_eq!(page.common_prefixes, vec!["a/"]);
        assert!(page.is_truncated);
        assert_eq!(page.next_resume_token.as_deref(), Some("b"));
    }

    #[test]
    fn continuation_does_not_repeat_collapsed_prefixes() {
        // First page of size 1 over a/1, a/2, b returns just the "a/" group.
        let rows = objs(&["a/1", "a/2", "b"]);
        let first = group_and_truncate(rows, None, "/", None, 1);
        assert_eq!(first.common_prefixes, vec!["a/"]);
        assert!(first.is_truncated);
        assert_eq!(first.next_resume_token.as_deref(), Some("a/"));

        // The next page scans keys > "a/", which still group into "a/"; the
        // marker check must drop that group and surface only "b".
        let rows = objs(&["a/1", "a/2", "b"]);
        let second = group_and_truncate(rows, None, "/", Some("a/"), 1);
        assert!(second.common_prefixes.is_empty());
        assert_eq!(second.objects.len(), 1);
        assert_eq!(second.objects[0].key, "b");
        assert!(!second.is_truncated);
    }

    #[test]
    fn prefix_and_delimiter_together() {
        let rows = objs(&["x/1", "x/2", "x/a/1"]);
        let page = group_and_truncate(rows, Some("x/"), "/", None, 10);
        assert_eq!(
            page.objects.iter().map(|o| o.key.as_str()).collect::<Vec<_>>(),
            vec!["x/1", "x/2"]
        );
        assert_eq!(page.common_prefixes, vec!["x/a/"]);
    }

    #[test]
    fn truncate_page_generic() {
        let (rows, truncated) = truncate_page(vec![1, 2, 3], 2);
        assert_eq!(rows, vec![1, 2]);
        assert!(truncated);
        let (rows, truncated) = truncate_page(vec![1, 2], 2);
        assert_eq!(rows, vec![1, 2]);
        assert!(!truncated);
    }
}
