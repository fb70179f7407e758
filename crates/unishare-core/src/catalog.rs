// Catalog browsing: text search and filters over collection snapshots.

use crate::models::{Category, Listing, Note};

/// Filters applied to a listings snapshot. Empty query matches everything.
#[derive(Debug, Clone, Default)]
pub struct ListingQuery<'a> {
    pub text: &'a str,
    pub category: Option<Category>,
    /// Restrict to these listing ids (a user's wishlist).
    pub only_ids: Option<&'a [String]>,
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Listings whose title or description contains the query text
/// (case-insensitive), after the category and id filters. Input order is
/// preserved.
pub fn search_listings<'l>(listings: &'l [Listing], query: &ListingQuery<'_>) -> Vec<&'l Listing> {
    let needle = query.text.trim().to_lowercase();
    listings
        .iter()
        .filter(|l| match query.only_ids {
            Some(ids) => ids.iter().any(|id| *id == l.id),
            None => true,
        })
        .filter(|l| query.category.map_or(true, |c| l.category == c))
        .filter(|l| {
            needle.is_empty() || contains_ci(&l.title, &needle) || contains_ci(&l.description, &needle)
        })
        .collect()
}

/// Notes matching `text` on title, subject, department or author.
pub fn search_notes<'n>(notes: &'n [Note], text: &str) -> Vec<&'n Note> {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return notes.iter().collect();
    }
    notes
        .iter()
        .filter(|n| {
            contains_ci(&n.title, &needle)
                || contains_ci(&n.subject, &needle)
                || contains_ci(&n.department, &needle)
                || contains_ci(&n.author, &needle)
        })
        .collect()
}

/// Notes for one department, the filter the notes channel applies per
/// subscriber.
pub fn notes_in_department(notes: &[Note], department: &str) -> Vec<Note> {
    notes
        .iter()
        .filter(|n| n.department == department)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;

    #[test]
    fn empty_query_returns_everything_in_order() {
        let listings = seed::listings();
        let hits = search_listings(&listings, &ListingQuery::default());
        assert_eq!(hits.len(), listings.len());
        assert_eq!(hits[0].id, listings[0].id);
    }

    #[test]
    fn text_matches_title_or_description_case_insensitively() {
        let listings = seed::listings();
        let hits = search_listings(
            &listings,
            &ListingQuery {
                text: "DRAFTER",
                ..Default::default()
            },
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "1");

        let hits = search_listings(
            &listings,
            &ListingQuery {
                text: "waterproof",
                ..Default::default()
            },
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "2");
    }

    #[test]
    fn category_filter() {
        let listings = seed::listings();
        let hits = search_listings(
            &listings,
            &ListingQuery {
                category: Some(Category::Sensors),
                ..Default::default()
            },
        );
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|l| l.category == Category::Sensors));
    }

    #[test]
    fn wishlist_filter() {
        let listings = seed::listings();
        let ids = vec!["3".to_string(), "missing".to_string()];
        let hits = search_listings(
            &listings,
            &ListingQuery {
                only_ids: Some(ids.as_slice()),
                ..Default::default()
            },
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "3");
    }

    #[test]
    fn notes_match_any_text_field() {
        let notes = seed::notes();
        assert_eq!(search_notes(&notes, "8086").len(), 1);
        assert_eq!(search_notes(&notes, "dsa")[0].id, "n2");
        assert_eq!(search_notes(&notes, "library scanned")[0].id, "n3");
        assert_eq!(search_notes(&notes, "").len(), notes.len());
        assert!(search_notes(&notes, "no such subject anywhere").is_empty());
    }

    #[test]
    fn department_filter() {
        let notes = seed::notes();
        let computer = notes_in_department(&notes, "Computer");
        assert_eq!(computer.len(), 1);
        assert_eq!(computer[0].id, "n1");
        assert!(notes_in_department(&notes, "Civil").is_empty());
    }
}
