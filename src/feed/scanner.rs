//! Candidate extraction from the current document state.

use super::types::{CandidateItem, DomSnapshot};
use super::FeedPage;

const OWNER_LINK_PREFIX: &str = "nameCard_";

/// Owner handle from a raw link attribute (`nameCard_10001` -> `10001`).
pub fn owner_from_link(link: &str) -> String {
    link.trim().replace(OWNER_LINK_PREFIX, "")
}

/// Pair controls with the content and owner at the same index. Missing
/// content or owner yields an empty string; an empty page yields no
/// candidates.
pub fn extract(snapshot: &DomSnapshot) -> Vec<CandidateItem> {
    snapshot
        .controls
        .iter()
        .enumerate()
        .map(|(position, control)| {
            let content = snapshot
                .contents
                .get(position)
                .map(|c| c.trim().to_string())
                .unwrap_or_default();
            let owner = snapshot
                .owner_links
                .get(position)
                .and_then(|l| l.as_deref())
                .map(owner_from_link)
                .unwrap_or_default();
            let group = snapshot.groups.get(position).cloned().flatten();
            CandidateItem {
                key: control.key.clone(),
                owner,
                group,
                content,
                already_acted: control.acted,
                position,
            }
        })
        .collect()
}

/// Scan the page in document order.
pub fn scan(page: &dyn FeedPage) -> Vec<CandidateItem> {
    extract(&page.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::ControlNode;

    fn control(key: &str, acted: bool) -> ControlNode {
        ControlNode {
            key: key.to_string(),
            acted,
        }
    }

    #[test]
    fn test_empty_page_is_not_an_error() {
        assert!(extract(&DomSnapshot::default()).is_empty());
    }

    #[test]
    fn test_document_order_and_owner_parsing() {
        let snapshot = DomSnapshot {
            controls: vec![control("a", false), control("b", true)],
            contents: vec!["  hello ".into(), "world".into()],
            owner_links: vec![Some("nameCard_10001".into()), Some("nameCard_10002".into())],
            groups: vec![None, Some("family".into())],
        };
        let items = extract(&snapshot);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].owner, "10001");
        assert_eq!(items[0].content, "hello");
        assert_eq!(items[0].position, 0);
        assert!(!items[0].already_acted);
        assert!(items[1].already_acted);
        assert_eq!(items[1].group.as_deref(), Some("family"));
    }

    #[test]
    fn test_short_side_lists_while_loading() {
        let snapshot = DomSnapshot {
            controls: vec![control("a", false), control("b", false)],
            contents: vec!["only one".into()],
            owner_links: vec![None],
            groups: vec![],
        };
        let items = extract(&snapshot);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].owner, "");
        assert_eq!(items[1].content, "");
        assert_eq!(items[1].group, None);
    }
}
