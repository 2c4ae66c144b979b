use serde::{Deserialize, Serialize};

/// One selectable option in a filter dropdown (a team, a folder, a label),
/// populated per-connector and returned by `get_filter_options` (spec §6
/// Connector Driver Interface).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterOption {
    pub id: String,
    pub label: String,
}

/// A page of filter options, cursor-paginated like the connectors' own
/// source APIs so a large team/folder list doesn't need to be materialized
/// in one response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterOptionsResponse {
    pub options: Vec<FilterOption>,
    pub cursor: Option<String>,
    pub has_more: bool,
}

impl FilterOptionsResponse {
    /// Paginate an in-memory option list by `(page, limit)` with optional
    /// case-insensitive substring search on the label — the shared
    /// implementation every connector's `get_filter_options` delegates to.
    pub fn paginate(mut options: Vec<FilterOption>, page: usize, limit: usize, search: Option<&str>) -> Self {
        if let Some(term) = search {
            let term = term.to_lowercase();
            options.retain(|opt| opt.label.to_lowercase().contains(&term));
        }
        let start = page.saturating_mul(limit);
        let has_more = options.len() > start + limit;
        let page_slice = options.into_iter().skip(start).take(limit).collect();
        FilterOptionsResponse { options: page_slice, cursor: None, has_more }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<FilterOption> {
        (0..5).map(|i| FilterOption { id: i.to_string(), label: format!("Team {i}") }).collect()
    }

    #[test]
    fn paginates_and_reports_has_more() {
        let page0 = FilterOptionsResponse::paginate(options(), 0, 2, None);
        assert_eq!(page0.options.len(), 2);
        assert!(page0.has_more);

        let page2 = FilterOptionsResponse::paginate(options(), 2, 2, None);
        assert_eq!(page2.options.len(), 1);
        assert!(!page2.has_more);
    }

    #[test]
    fn search_filters_by_label_case_insensitively() {
        let result = FilterOptionsResponse::paginate(options(), 0, 10, Some("team 3"));
        assert_eq!(result.options.len(), 1);
        assert_eq!(result.options[0].id, "3");
    }
}
