use media_model::{params, MediaItem, MediaQuery};

/// Whether an item satisfies a query's filter parameters.
///
/// Used to decide which existing windows a newly seen item belongs to.
/// `search` matches a case-insensitive title substring; `mime_type` matches
/// by prefix, so `"image/"` selects every image subtype. Unknown parameters
/// do not constrain the match; only the remote side interprets them.
pub fn item_matches(item: &MediaItem, query: &MediaQuery) -> bool {
    if let Some(search) = query.str_param(params::SEARCH) {
        let title = item.title().unwrap_or_default().to_lowercase();
        if !title.contains(&search.to_lowercase()) {
            return false;
        }
    }

    if let Some(prefix) = query.str_param(params::MIME_TYPE) {
        match item.mime_type() {
            Some(mime) if mime.starts_with(prefix) => {}
            _ => return false,
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_model::{fields, ItemId};
    use pretty_assertions::assert_eq;

    fn image(title: &str) -> MediaItem {
        let mut item = MediaItem::new(ItemId::from(1), 1);
        item.set_field(fields::TITLE, title);
        item.set_field(fields::MIME_TYPE, "image/png");
        item
    }

    #[test]
    fn search_matches_title_substring_case_insensitively() {
        let item = image("Holiday Photos");
        assert_eq!(item_matches(&item, &MediaQuery::new().with("search", "photo")), true);
        assert_eq!(item_matches(&item, &MediaQuery::new().with("search", "video")), false);
    }

    #[test]
    fn mime_type_matches_by_prefix() {
        let item = image("a");
        assert_eq!(item_matches(&item, &MediaQuery::new().with("mime_type", "image/")), true);
        assert_eq!(item_matches(&item, &MediaQuery::new().with("mime_type", "image/png")), true);
        assert_eq!(item_matches(&item, &MediaQuery::new().with("mime_type", "video/")), false);
    }

    #[test]
    fn item_without_mime_fails_a_mime_filter() {
        let mut item = image("a");
        item.fields.remove(fields::MIME_TYPE);
        assert_eq!(item_matches(&item, &MediaQuery::new().with("mime_type", "image/")), false);
    }

    #[test]
    fn unconstrained_query_matches_everything() {
        assert_eq!(item_matches(&image("a"), &MediaQuery::new()), true);
    }
}
