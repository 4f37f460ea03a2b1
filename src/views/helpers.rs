//! Template helpers
//!
//! Pure formatting functions registered as minijinja filters and
//! functions.

use chrono::{DateTime, Utc};
use minijinja::{Error, ErrorKind, Value};

pub const DEFAULT_DATE_FORMAT: &str = "%B %-d, %Y";

/// `{{ story.created_at | format_date }}` or `format_date("%Y-%m-%d")`
///
/// Accepts RFC 3339 timestamps, which is how `DateTime<Utc>` serializes.
pub fn format_date(value: String, format: Option<String>) -> Result<String, Error> {
    let date = DateTime::parse_from_rfc3339(&value)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|e| {
            Error::new(ErrorKind::InvalidOperation, "format_date expects an RFC 3339 date")
                .with_source(e)
        })?;
    let format = format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT);
    Ok(date.format(format).to_string())
}

/// Shorten `value` to at most `len` characters plus an ellipsis,
/// preferring to cut at the last space.
pub fn truncate(value: String, len: usize) -> String {
    if value.chars().count() <= len {
        return value;
    }

    let cut: String = value.chars().take(len).collect();
    let trimmed = match cut.rfind(' ') {
        Some(index) if index > 0 => &cut[..index],
        _ => cut.as_str(),
    };
    format!("{trimmed}...")
}

/// Remove all markup and return the plain text.
pub fn strip_tags(value: String) -> String {
    let cleaned = ammonia::Builder::empty()
        .clean_content_tags(["script", "style"].into_iter().collect())
        .clean(&value)
        .to_string();
    html_escape::decode_html_entities(&cleaned).into_owned()
}

/// Clean user-written HTML so it can be rendered unescaped.
pub fn sanitize(value: String) -> Value {
    Value::from_safe_string(ammonia::clean(&value))
}

/// Edit link for a story, shown only to its owner.
pub fn edit_icon(
    story_user_id: String,
    logged_user_id: String,
    story_id: String,
    floating: Option<bool>,
) -> Value {
    if story_user_id != logged_user_id {
        return Value::from_safe_string(String::new());
    }

    let href = format!(
        "/stories/edit/{}",
        html_escape::encode_double_quoted_attribute(&story_id)
    );
    let markup = if floating.unwrap_or(true) {
        format!(
            r#"<a href="{href}" class="btn-floating halfway-fab blue"><i class="fas fa-edit fa-small"></i></a>"#
        )
    } else {
        format!(r#"<a href="{href}"><i class="fas fa-edit"></i></a>"#)
    };
    Value::from_safe_string(markup)
}

/// Block filter that marks the `<option>` whose value is `selected`.
///
/// ```text
/// {% filter select(story.status) %}
///   <option value="public">Public</option>
///   <option value="draft">Draft</option>
/// {% endfilter %}
/// ```
pub fn select(options: String, selected: String) -> Value {
    let needle = format!(
        r#" value="{}""#,
        html_escape::encode_double_quoted_attribute(&selected)
    );
    let marked = match options.find(&needle) {
        Some(index) => {
            let end = index + needle.len();
            format!(r#"{} selected="selected"{}"#, &options[..end], &options[end..])
        }
        None => options,
    };
    Value::from_safe_string(marked)
}
