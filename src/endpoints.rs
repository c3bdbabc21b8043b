//! Named Reddit endpoints.
//!
//! Paths are grouped by their shared prefix and composed onto the base URL
//! once, when the registry is built. Placeholders such as `{subreddit}` are
//! filled positionally by [`UrlRegistry::format`] and stand for one path
//! segment. A trailing `*`, as in `{page*}`, lets the value span segments.

use crate::error::{RedditClientError, Result};
use crate::util::url_join;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::collections::HashMap;
use url::Url;

/// Bytes escaped inside a single path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

type Group = (&'static str, &'static [(&'static str, &'static str)]);

const ENDPOINT_GROUPS: &[Group] = &[
    (
        "",
        &[
            ("front_page", ""),
            ("hot", "hot"),
            ("new", "new"),
            ("top", "top"),
            ("controversial", "controversial"),
            ("rising", "rising"),
            ("search", "search"),
            ("submission", "comments/{id}"),
            ("comment_thread", "comments/{id}/_/{comment}"),
            ("duplicates", "duplicates/{id}"),
            ("subreddits_popular", "subreddits/popular"),
            ("subreddits_new", "subreddits/new"),
            ("subreddits_search", "subreddits/search"),
        ],
    ),
    (
        "api/",
        &[
            ("approve", "approve"),
            ("comment", "comment"),
            ("compose", "compose"),
            ("del", "del"),
            ("del_msg", "del_msg"),
            ("distinguish", "distinguish"),
            ("edit", "editusertext"),
            ("hide", "hide"),
            ("info", "info"),
            ("lock", "lock"),
            ("marknsfw", "marknsfw"),
            ("morechildren", "morechildren"),
            ("read_message", "read_message"),
            ("remove", "remove"),
            ("report", "report"),
            ("save", "save"),
            ("search_reddit_names", "search_reddit_names"),
            ("spoiler", "spoiler"),
            ("submit", "submit"),
            ("subscribe", "subscribe"),
            ("unhide", "unhide"),
            ("unlock", "unlock"),
            ("unmarknsfw", "unmarknsfw"),
            ("unread_message", "unread_message"),
            ("unsave", "unsave"),
            ("unspoiler", "unspoiler"),
            ("vote", "vote"),
            ("multireddit_api", "multi/user/{user}/m/{multi}"),
            ("multireddit_mine", "multi/mine"),
            ("mod_notes", "mod/notes"),
            ("modmail_conversations", "mod/conversations"),
        ],
    ),
    (
        "api/v1/me",
        &[
            ("me", ""),
            ("friends", "friends"),
            ("karma", "karma"),
            ("preferences", "prefs"),
            ("trophies", "trophies"),
        ],
    ),
    ("prefs/", &[("blocked", "blocked")]),
    (
        "r/{subreddit}/",
        &[
            ("subreddit", ""),
            ("subreddit_about", "about"),
            ("subreddit_hot", "hot"),
            ("subreddit_new", "new"),
            ("subreddit_top", "top"),
            ("subreddit_controversial", "controversial"),
            ("subreddit_rising", "rising"),
            ("subreddit_gilded", "gilded"),
            ("subreddit_comments", "comments"),
            ("subreddit_search", "search"),
            ("subreddit_random", "random"),
            ("subreddit_rules", "about/rules"),
            ("stylesheet", "about/stylesheet"),
            ("modlog", "about/log"),
            ("moderators", "about/moderators"),
            ("contributors", "about/contributors"),
            ("banned", "about/banned"),
            ("flairlist", "api/flairlist"),
            ("wiki_page", "wiki/{page*}"),
            ("wiki_pages", "wiki/pages"),
            ("wiki_edit", "api/wiki/edit"),
        ],
    ),
    (
        "user/{user}/",
        &[
            ("user", ""),
            ("user_about", "about"),
            ("user_comments", "comments"),
            ("user_downvoted", "downvoted"),
            ("user_gilded", "gilded"),
            ("user_hidden", "hidden"),
            ("user_overview", "overview"),
            ("user_saved", "saved"),
            ("user_submitted", "submitted"),
            ("user_upvoted", "upvoted"),
        ],
    ),
    (
        "message/",
        &[
            ("inbox", "inbox"),
            ("unread", "unread"),
            ("sent", "sent"),
            ("mentions", "mentions"),
            ("moderator_messages", "moderator"),
            ("message", "messages/{id}"),
        ],
    ),
];

/// Read-only map from endpoint name to URL template.
#[derive(Debug, Clone)]
pub struct UrlRegistry {
    base: String,
    templates: HashMap<&'static str, String>,
}

impl UrlRegistry {
    pub fn new(base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)?;
        if parsed.cannot_be_a_base() {
            return Err(RedditClientError::ConfigError(format!(
                "base URL '{}' cannot carry paths",
                base_url
            )));
        }

        let mut templates = HashMap::new();
        for (prefix, paths) in ENDPOINT_GROUPS {
            let group_base = url_join(base_url, prefix);
            for (name, path) in paths.iter() {
                let previous = templates.insert(*name, url_join(&group_base, path));
                if previous.is_some() {
                    return Err(RedditClientError::ConfigError(format!(
                        "endpoint '{}' is registered twice",
                        name
                    )));
                }
            }
        }

        Ok(Self {
            base: base_url.to_string(),
            templates,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// The URL template registered under `name`.
    pub fn lookup(&self, name: &str) -> Result<&str> {
        self.templates
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| RedditClientError::ConfigError(format!("unknown endpoint '{}'", name)))
    }

    /// Templates for several endpoints, in the order given.
    pub fn group(&self, names: &[&str]) -> Result<Vec<String>> {
        names
            .iter()
            .map(|name| self.lookup(name).map(str::to_string))
            .collect()
    }

    /// Look up `name` and fill its placeholders with `args`, in order.
    pub fn format(&self, name: &str, args: &[String]) -> Result<String> {
        fill_template(self.lookup(name)?, args)
    }

    /// Resolve a raw API path (e.g. `r/rust/about`) against the base URL.
    pub fn resolve_path(&self, path: &str, args: &[String]) -> Result<String> {
        fill_template(&url_join(&self.base, path), args)
    }
}

/// Replace each `{...}` placeholder with the next positional argument.
pub fn fill_template(template: &str, args: &[String]) -> Result<String> {
    let mut out = String::with_capacity(template.len() + 16);
    let mut args_iter = args.iter();
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        let end = rest[start..].find('}').map(|i| start + i).ok_or_else(|| {
            RedditClientError::ConfigError(format!("unterminated placeholder in '{}'", template))
        })?;
        out.push_str(&rest[..start]);
        let placeholder = &rest[start..=end];
        let arg = args_iter.next().ok_or_else(|| {
            RedditClientError::ClientError(format!(
                "missing value for placeholder {} in '{}'",
                placeholder, template
            ))
        })?;
        out.push_str(&encode_argument(arg, placeholder.ends_with("*}"))?);
        rest = &rest[end + 1..];
    }
    out.push_str(rest);

    if args_iter.next().is_some() {
        return Err(RedditClientError::ClientError(format!(
            "too many path arguments for '{}'",
            template
        )));
    }
    Ok(out)
}

fn encode_argument(arg: &str, multi_segment: bool) -> Result<String> {
    let invalid = || RedditClientError::ClientError(format!("invalid path argument '{}'", arg));
    if !multi_segment && arg.contains('/') {
        return Err(invalid());
    }

    let mut segments = Vec::new();
    for segment in arg.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(invalid());
        }
        segments.push(utf8_percent_encode(segment, SEGMENT).to_string());
    }
    Ok(segments.join("/"))
}

/// Whether `url` is an instance of `template`, with each placeholder
/// matching a non-empty segment (or several, for `{name*}`).
pub fn template_matches(template: &str, url: &str) -> bool {
    let Some(start) = template.find('{') else {
        return template == url;
    };
    let Some(end) = template[start..].find('}').map(|i| start + i) else {
        return false;
    };
    let Some(rest) = url.strip_prefix(&template[..start]) else {
        return false;
    };
    let multi_segment = template[start..=end].ends_with("*}");
    let tail = &template[end + 1..];

    for (i, c) in rest.char_indices() {
        if c == '/' && !multi_segment {
            break;
        }
        if template_matches(tail, &rest[i + c.len_utf8()..]) {
            return true;
        }
    }
    false
}
