//! Stop-sequence handling for decoded output.

/// Finds the earliest configured stop sequence in generated text.
#[derive(Debug, Clone, Default)]
pub struct StopMatcher {
    stops: Vec<String>,
}

impl StopMatcher {
    pub fn new<I, S>(stops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let stops = stops.into_iter().map(Into::into).filter(|s: &String| !s.is_empty()).collect();
        Self { stops }
    }

    /// Byte offset of the earliest stop sequence in `text`.
    pub fn earliest(&self, text: &str) -> Option<usize> {
        self.stops.iter().filter_map(|s| text.find(s.as_str())).min()
    }

    /// Append `piece` to `text` and look for a stop sequence that ends inside it.
    /// Only the tail that can hold a new match is scanned.
    pub fn scan_appended(&self, text: &mut String, piece: &str) -> Option<usize> {
        let longest = self.stops.iter().map(String::len).max().unwrap_or(0);
        let mut from = text.len().saturating_sub(longest.saturating_sub(1));
        while !text.is_char_boundary(from) {
            from -= 1;
        }
        text.push_str(piece);
        self.earliest(&text[from..]).map(|pos| from + pos)
    }

    /// Text before the earliest stop sequence, and whether one was found.
    pub fn cut<'a>(&self, text: &'a str) -> (&'a str, bool) {
        match self.earliest(text) {
            Some(pos) => (&text[..pos], true),
            None => (text, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuts_at_earliest_stop_and_drops_it() {
        let m = StopMatcher::new(["</s>", "Context:", "Question:"]);
        let (kept, hit) = m.cut("The ask is $1M. Question: what else? Context: x");
        assert!(hit);
        assert_eq!(kept, "The ask is $1M. ");
    }

    #[test]
    fn text_without_stops_is_untouched() {
        let m = StopMatcher::new(["Question:"]);
        assert_eq!(m.cut("plain answer"), ("plain answer", false));
    }

    #[test]
    fn stop_split_across_pieces_is_found() {
        let m = StopMatcher::new(["</s>", "Question:"]);
        let mut text = String::new();
        assert_eq!(m.scan_appended(&mut text, "The ask is $1M. Que"), None);
        assert_eq!(m.scan_appended(&mut text, "stion: more"), Some(16));
        assert_eq!(&text[..16], "The ask is $1M. ");
    }

    #[test]
    fn scan_handles_multibyte_tail() {
        let m = StopMatcher::new(["END"]);
        let mut text = String::from("prix 5\u{20ac}");
        assert_eq!(m.scan_appended(&mut text, "EN"), None);
        assert_eq!(m.scan_appended(&mut text, "D"), Some("prix 5\u{20ac}".len()));
    }

    #[test]
    fn scan_without_stops_only_appends() {
        let m = StopMatcher::new(Vec::<String>::new());
        let mut text = String::from("a");
        assert_eq!(m.scan_appended(&mut text, "b"), None);
        assert_eq!(text, "ab");
    }

    #[test]
    fn empty_stops_are_ignored() {
        let m = StopMatcher::new(["", "END"]);
        assert_eq!(m.cut("x END"), ("x ", true));
        assert_eq!(m.earliest("no end here"), None);
    }
}
