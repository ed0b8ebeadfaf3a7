
use super::*;

pub(crate) fn row(pairs: &[(&str, serde_json::Value)]) -> EntityRow {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn test_page_from_total_counts_pages() {
    let request = PageRequest::new(0, 2);
    let page = Page::from_total(vec![], request, 3);
    assert_eq!(page.total_pages, 2);
    assert!(page.has_next);

    let last = Page::from_total(vec![], PageRequest::new(1, 2), 3);
    assert_eq!(last.total_pages, 2);
    assert!(!last.has_next);
}

#[test]
fn test_page_from_total_exact_multiple() {
    let page = Page::from_total(vec![], PageRequest::new(1, 5), 10);
    assert_eq!(page.total_pages, 2);
    assert!(!page.has_next, "second of two full pages has no successor");
}

#[test]
fn test_empty_page_has_no_pages() {
    let page = Page::empty();
    assert_eq!(page.total_pages, 0);
    assert!(!page.has_next);
    assert!(page.rows.is_empty());
}

#[test]
fn test_page_request_offset() {
    assert_eq!(PageRequest::new(0, 1000).offset(), 0);
    assert_eq!(PageRequest::new(3, 250).offset(), 750);
}
