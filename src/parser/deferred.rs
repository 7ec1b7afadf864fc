//! Deferred region capture
//!
//! A template body (retain mode) or an ignored-namespace subtree (discard
//! mode) is not instantiated; the driver tracks structure only and, in
//! retain mode, hands the exact source span plus a prefix-table snapshot
//! to the owning construct for independent later compilation.
//!
//! Matching is keyed by local tag name only. Nested elements sharing the
//! sentinel's local name must be counted exactly or the close detection
//! drifts and corrupts the remainder of the parse, so the depth update
//! happens before any other per-event handling.

/// What happens to the captured span when the region closes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Hand the span and prefix snapshot to the owning construct
    Retain,
    /// Ignored-namespace subtree; walked for balance, then dropped
    Discard,
}

/// The materialized result of a retained region
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredBody {
    pub markup: String,
    /// Prefix bindings visible at capture time
    pub prefixes: Vec<(Option<String>, String)>,
}

/// Active capture state, alive between the triggering start-element and
/// its matching end-element
pub struct DeferredRegion {
    sentinel: String,
    mode: CaptureMode,
    /// Byte offset just past the triggering start tag
    body_start: usize,
    /// Nested elements sharing the sentinel's local name
    sentinel_depth: usize,
    /// Element nesting depth within the region
    element_depth: usize,
    /// Elements opened directly at region depth zero
    roots: usize,
    prefixes: Vec<(Option<String>, String)>,
}

impl DeferredRegion {
    pub fn new(
        sentinel: &str,
        mode: CaptureMode,
        body_start: usize,
        prefixes: Vec<(Option<String>, String)>,
    ) -> Self {
        DeferredRegion {
            sentinel: sentinel.to_string(),
            mode,
            body_start,
            sentinel_depth: 0,
            element_depth: 0,
            roots: 0,
            prefixes,
        }
    }

    #[inline]
    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    /// Elements opened directly under the region; a retained template
    /// body must have exactly one
    pub fn root_count(&self) -> usize {
        self.roots
    }

    /// Track a start-element seen while buffering
    pub fn on_start(&mut self, local: &str) {
        if local == self.sentinel {
            self.sentinel_depth += 1;
        }
        if self.element_depth == 0 {
            self.roots += 1;
        }
        self.element_depth += 1;
    }

    /// Track an end-element. Returns true when it is the region's own
    /// close tag.
    pub fn on_end(&mut self, local: &str) -> bool {
        if local == self.sentinel {
            if self.sentinel_depth == 0 {
                return true;
            }
            self.sentinel_depth -= 1;
        }
        self.element_depth = self.element_depth.saturating_sub(1);
        false
    }

    /// Materialize the captured span. `end_tag_start` is the byte offset
    /// of the region's own `</` close tag.
    pub fn capture(self, input: &[u8], end_tag_start: usize) -> Option<DeferredBody> {
        let start = self.body_start.min(input.len());
        let end = end_tag_start.clamp(start, input.len());
        let markup = String::from_utf8_lossy(&input[start..end]).into_owned();
        Some(DeferredBody {
            markup,
            prefixes: self.prefixes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_same_name_counts() {
        // <Tmpl> ... <Tmpl/> ... </Tmpl>: the inner close must not end
        // the region
        let mut region = DeferredRegion::new("Tmpl", CaptureMode::Retain, 0, Vec::new());
        region.on_start("Tmpl");
        assert!(!region.on_end("Tmpl"));
        assert!(region.on_end("Tmpl"));
    }

    #[test]
    fn test_other_names_do_not_close() {
        let mut region = DeferredRegion::new("Tmpl", CaptureMode::Retain, 0, Vec::new());
        region.on_start("Canvas");
        assert!(!region.on_end("Canvas"));
        assert!(region.on_end("Tmpl"));
    }

    #[test]
    fn test_root_count() {
        let mut region = DeferredRegion::new("Tmpl", CaptureMode::Retain, 0, Vec::new());
        region.on_start("Canvas");
        region.on_start("Rectangle");
        region.on_end("Rectangle");
        region.on_end("Canvas");
        region.on_start("Ellipse");
        region.on_end("Ellipse");
        assert_eq!(region.root_count(), 2);
    }

    #[test]
    fn test_capture_slices_body() {
        let input = b"<Tmpl><a/>text</Tmpl>";
        let region = DeferredRegion::new("Tmpl", CaptureMode::Retain, 6, Vec::new());
        let body = region.capture(input, 14).unwrap();
        assert_eq!(body.markup, "<a/>text");
    }
}
