use log::debug;

use super::codec;

/// Owner of the navigation token, the single record of which panes are open.
///
/// Every mutation reads the current token, computes the new title list and
/// publishes a freshly encoded token in one step. Callers never see a
/// half-updated list. `revision` bumps on each published change so views can
/// tell when to recompute.
#[derive(Debug, Default, Clone)]
pub struct PaneStack {
    token: Option<String>,
    revision: u64,
}

impl PaneStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the stack from an externally supplied token. Blank and repeated
    /// titles are dropped here, keeping the first occurrence.
    pub fn from_token(token: Option<String>) -> Self {
        let mut titles: Vec<String> = Vec::new();
        for title in codec::decode(token.as_deref()) {
            if is_blank(&title) || titles.contains(&title) {
                debug!("Dropping invalid entry {title:?} from initial token");
                continue;
            }
            titles.push(title);
        }
        Self {
            token: codec::encode(&titles),
            revision: 0,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn titles(&self) -> Vec<String> {
        codec::decode(self.token.as_deref())
    }

    pub fn len(&self) -> usize {
        self.titles().len()
    }

    pub fn is_empty(&self) -> bool {
        self.token.is_none()
    }

    pub fn contains(&self, title: &str) -> bool {
        self.titles().iter().any(|open| open == title)
    }

    /// Position of `title` in the current token. Always computed fresh.
    pub fn index_of(&self, title: &str) -> Option<usize> {
        self.titles().iter().position(|open| open == title)
    }

    /// Appends `title` unless it is already open or cannot be carried by the
    /// token. Returns whether the token changed.
    pub fn open(&mut self, title: &str) -> bool {
        let mut titles = self.titles();
        if !is_valid_title(title) || titles.iter().any(|open| open == title) {
            return false;
        }
        titles.push(title.to_string());
        self.publish(&titles);
        true
    }

    /// Inserts `new_title` right after `anchor_title`, or at the end when the
    /// anchor is not open. Does nothing when `new_title` is already open, so
    /// repeated activations of the same link are harmless.
    pub fn insert_after(&mut self, anchor_title: &str, new_title: &str) -> bool {
        let mut titles = self.titles();
        if !is_valid_title(new_title) || titles.iter().any(|open| open == new_title) {
            return false;
        }
        let position = titles
            .iter()
            .position(|open| open == anchor_title)
            .map(|index| index + 1)
            .unwrap_or(titles.len());
        titles.insert(position, new_title.to_string());
        self.publish(&titles);
        true
    }

    /// Removes the first occurrence of `title`. Closing the last pane
    /// publishes the absent token.
    pub fn close(&mut self, title: &str) -> bool {
        let mut titles = self.titles();
        let Some(index) = titles.iter().position(|open| open == title) else {
            return false;
        };
        titles.remove(index);
        self.publish(&titles);
        true
    }

    fn publish(&mut self, titles: &[String]) {
        self.token = codec::encode(titles);
        self.revision += 1;
        debug!("Published token {:?} (rev {})", self.token, self.revision);
    }
}

fn is_blank(title: &str) -> bool {
    title.trim().is_empty()
}

/// A title the token can hold as exactly one entry
fn is_valid_title(title: &str) -> bool {
    !is_blank(title) && !title.contains(codec::SEPARATOR)
}
