//! Scanners that find entities in message text.
//!
//! Every scanner appends to an [`EntityCollection`] in left-to-right order and
//! never fails. Spans are byte offsets (see [`Span`]). Running a scanner twice
//! over the same collection appends the same entities twice.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{EntityCollection, HashtagEntity, MentionEntity, Span, UrlEntity};

/// Characters that end a URL body outright.
const URL_BODY: &str = r#"[^\s<>"`{}|\\^]+"#;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"(?i)(?:(?:https?|ftps?|sftp|ssh|git|wss?|file|ircs?)://{body}|(?:mailto|tel):{body}|magnet:\?{body})",
        body = URL_BODY
    );
    Regex::new(&pattern).expect("URL pattern compiles")
});

// `.` stops at `\n`, so a mention runs to the end of its line.
static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@.+").expect("mention pattern compiles"));

static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#[\p{L}\p{N}_]+").expect("hashtag pattern compiles"));

/// Append a [`UrlEntity`] for every strictly well-formed URL in `text`.
///
/// A URL needs an explicit scheme (`https://`, `ftp://`, `mailto:` ...); bare
/// hosts like `example.com` are not matched, and neither is `http://#` or
/// anything else whose authority does not start a host. The scheme may be glued to
/// preceding letters (`abchttps://x` matches from the `h`). Trailing sentence
/// punctuation and unbalanced closing brackets are not part of the match.
///
/// ```
/// use tidings_entity::{scan_urls, EntityCollection, Span};
///
/// let mut entities = EntityCollection::default();
/// scan_urls("see https://example.com/hoge.", &mut entities);
/// assert_eq!(entities.urls[0].url, "https://example.com/hoge");
/// assert_eq!(entities.urls[0].span, Span::new(4, 28));
/// ```
pub fn scan_urls(text: &str, entities: &mut EntityCollection) {
    for m in URL_RE.find_iter(text) {
        let end = m.start() + trimmed_len(m.as_str());
        let candidate = &text[m.start()..end];
        if !has_body(candidate) {
            continue;
        }
        entities
            .urls
            .push(UrlEntity::new(Span::new(m.start(), end), candidate));
    }
}

/// Append a [`MentionEntity`] for every `@` run in `text`.
///
/// A mention starts at `@` and runs greedily to the end of the line, so
/// `"@a @b"` is a single mention.
pub fn scan_mentions(text: &str, entities: &mut EntityCollection) {
    for m in MENTION_RE.find_iter(text) {
        entities.mentions.push(MentionEntity {
            span: Span::new(m.start(), m.end()),
            name: m.as_str().to_string(),
        });
    }
}

/// Append a [`HashtagEntity`] for every `#word` in `text`, where the word is
/// a run of Unicode letters, digits or `_`.
pub fn scan_hashtags(text: &str, entities: &mut EntityCollection) {
    for m in HASHTAG_RE.find_iter(text) {
        entities.hashtags.push(HashtagEntity {
            span: Span::new(m.start(), m.end()),
            text: m.as_str().to_string(),
        });
    }
}

/// Run the URL, mention and hashtag scanners in that order.
pub fn scan_all(text: &str, entities: &mut EntityCollection) {
    scan_urls(text, entities);
    scan_mentions(text, entities);
    scan_hashtags(text, entities);
}

/// Length of `raw` once trailing punctuation and unbalanced closers are cut.
fn trimmed_len(raw: &str) -> usize {
    let (mut parens, mut brackets) = (0isize, 0isize);
    for c in raw.chars() {
        match c {
            '(' => parens -= 1,
            ')' => parens += 1,
            '[' => brackets -= 1,
            ']' => brackets += 1,
            _ => {}
        }
    }

    // parens/brackets: closers minus openers still left in raw[..end]
    let mut end = raw.len();
    for last in raw.chars().rev() {
        let cut = match last {
            '.' | ',' | ':' | ';' | '!' | '?' | '\'' => true,
            ')' if parens > 0 => {
                parens -= 1;
                true
            }
            ']' if brackets > 0 => {
                brackets -= 1;
                true
            }
            _ => false,
        };
        if !cut {
            break;
        }
        end -= last.len_utf8();
    }
    end
}

/// Something must follow the scheme. For `scheme://` URLs other than
/// `file://` that something is a host, starting with a letter, a digit, or
/// `[` for an IPv6 literal.
fn has_body(candidate: &str) -> bool {
    let Some((scheme, rest)) = candidate.split_once(':') else {
        return false;
    };
    match rest.strip_prefix("//") {
        Some(authority) if !scheme.eq_ignore_ascii_case("file") => authority
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '['),
        _ => !rest.trim_start_matches(['/', '?']).is_empty(),
    }
}
