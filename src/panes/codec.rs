//! Flat text form of the open pane list: `Title_One,Title_Two`.
//!
//! The codec is lossless and does no cleanup: empty and duplicate entries
//! survive a decode unchanged. Titles containing a comma cannot be encoded.

/// Name of the location parameter carrying the token
pub const PAGE_PARAM: &str = "page";

pub(crate) const SEPARATOR: char = ',';

pub fn decode(token: Option<&str>) -> Vec<String> {
    match token {
        None | Some("") => Vec::new(),
        Some(token) => token.split(SEPARATOR).map(str::to_string).collect(),
    }
}

/// An empty list encodes to `None`, never to an empty string, so "nothing
/// open" stays distinct from "one pane with an empty title".
pub fn encode(titles: &[String]) -> Option<String> {
    if titles.is_empty() {
        None
    } else {
        Some(titles.join(&SEPARATOR.to_string()))
    }
}

/// Pulls the `page` parameter out of a location string.
///
/// Accepts a bare query (`page=Cat,Dog`), one with a leading `?`, or a full
/// address (`https://host/?page=Cat&x=1`). A parameter present with an empty
/// value is treated as absent.
pub fn token_from_location(location: &str) -> Option<String> {
    let query = match location.split_once('?') {
        Some((_, query)) => query,
        None => location,
    };
    let query = query.split('#').next().unwrap_or_default();

    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == PAGE_PARAM)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Renders the location parameter for a token, or an empty string when
/// nothing is open.
pub fn location_for(token: Option<&str>) -> String {
    match token {
        Some(token) => format!("{PAGE_PARAM}={token}"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn absent_and_empty_decode_to_nothing() {
        assert!(decode(None).is_empty());
        assert!(decode(Some("")).is_empty());
    }

    #[test]
    fn decode_keeps_order_duplicates_and_empties() {
        assert_eq!(
            decode(Some("Cat,,Dog,Cat")),
            titles(&["Cat", "", "Dog", "Cat"])
        );
    }

    #[test]
    fn empty_list_encodes_to_absent() {
        assert_eq!(encode(&[]), None);
    }

    #[test]
    fn encode_joins_in_order() {
        assert_eq!(
            encode(&titles(&["Cat", "Dog", "Bird"])),
            Some("Cat,Dog,Bird".to_string())
        );
    }

    #[test]
    fn round_trip_for_comma_free_titles() {
        let cases = [
            titles(&["Cat"]),
            titles(&["Cat", "Dog"]),
            titles(&["Rust_(programming_language)", "C%2B%2B", "Ünïcode"]),
        ];
        for case in cases {
            assert_eq!(decode(encode(&case).as_deref()), case);
        }
    }

    #[test]
    fn location_parsing() {
        assert_eq!(
            token_from_location("page=Cat,Dog"),
            Some("Cat,Dog".to_string())
        );
        assert_eq!(
            token_from_location("?page=Cat"),
            Some("Cat".to_string())
        );
        assert_eq!(
            token_from_location("https://example.org/?theme=x&page=A,B#top"),
            Some("A,B".to_string())
        );
        assert_eq!(token_from_location("?page="), None);
        assert_eq!(token_from_location("?other=1"), None);
        assert_eq!(token_from_location(""), None);
    }

    #[test]
    fn location_rendering() {
        assert_eq!(location_for(Some("Cat,Dog")), "page=Cat,Dog");
        assert_eq!(location_for(None), "");
    }
}
