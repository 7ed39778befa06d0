use ecb_core::{CutoffPoint, Entry, Page, collapse_newlines};

/// A way of finding where entries end on a page.
///
/// Implementations only report cutoff points; turning them into entries is
/// shared so every strategy partitions pages the same way.
pub trait BoundaryStrategy: Send + Sync {
    /// Short name for logs and reports.
    fn name(&self) -> &'static str;

    /// Byte offsets in `page.text` after which a new entry begins.
    ///
    /// Order and duplicates do not matter.
    fn cutoffs(&self, page: &Page) -> Vec<CutoffPoint>;

    /// Cut every page into entries, keeping page order.
    fn segment(&self, pages: &[Page]) -> Vec<Entry> {
        pages
            .iter()
            .flat_map(|page| slice_page(page, &self.cutoffs(page)))
            .collect()
    }
}

/// Slice a page at `cutoffs`.
///
/// The raw slices are contiguous and cover the whole page, so concatenating
/// them restores `page.text`. Empty slices are dropped; whitespace-only
/// slices are kept so the classifier can flag them.
pub fn slice_page(page: &Page, cutoffs: &[CutoffPoint]) -> Vec<Entry> {
    let text = page.text.as_str();
    let mut bounds: Vec<usize> = cutoffs
        .iter()
        .map(|c| c.offset)
        .filter(|&o| o > 0 && o < text.len() && text.is_char_boundary(o))
        .collect();
    bounds.sort_unstable();
    bounds.dedup();
    bounds.insert(0, 0);
    bounds.push(text.len());

    bounds
        .windows(2)
        .filter(|w| w[0] < w[1])
        .map(|w| {
            let span = w[0]..w[1];
            Entry::from_page(page, span.clone(), collapse_newlines(&text[span]))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_page_partitions_text() {
        let page = Page::new(0, "One. 08.\nTwo. 08.\ntail");
        let cuts = [CutoffPoint::exact(8), CutoffPoint::exact(17), CutoffPoint::exact(8)];
        let entries = slice_page(&page, &cuts);
        let texts: Vec<&str> = entries.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["One. 08.", "Two. 08.", "tail"]);

        let rebuilt: String = entries
            .iter()
            .map(|e| &page.text[e.span.clone().unwrap()])
            .collect();
        assert_eq!(rebuilt, page.text);
    }

    #[test]
    fn test_no_cutoffs_gives_whole_page() {
        let page = Page::new(2, "A single\nentry");
        let entries = slice_page(&page, &[]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "A single entry");
        assert_eq!(entries[0].page, Some(3));
    }

    #[test]
    fn test_cutoffs_at_edges_are_ignored() {
        let page = Page::new(0, "abc");
        let entries = slice_page(&page, &[CutoffPoint::exact(0), CutoffPoint::exact(3)]);
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_empty_page_has_no_entries() {
        assert!(slice_page(&Page::new(0, ""), &[]).is_empty());
    }

    #[test]
    fn test_whitespace_slice_kept() {
        let page = Page::new(0, "Entry. 08.\n");
        let entries = slice_page(&page, &[CutoffPoint::exact(10)]);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].text, "");
    }
}
