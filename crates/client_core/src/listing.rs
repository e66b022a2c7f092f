//! Search, company filter and pagination over collections already in memory.

use shared::domain::{Company, CompanyId, Store, User};

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based.
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Companies whose name contains `query`, or whose tax id contains the
/// digits of `query`. A blank query matches everything.
pub fn filter_companies<'a>(companies: &'a [Company], query: &str) -> Vec<&'a Company> {
    let needle = query.trim().to_lowercase();
    let needle_digits = digits_only(&needle);
    companies
        .iter()
        .filter(|company| {
            needle.is_empty()
                || contains_ignore_case(&company.name, &needle)
                || (!needle_digits.is_empty()
                    && digits_only(&company.tax_id).contains(&needle_digits))
        })
        .collect()
}

/// Stores of `company` (or of every company) whose name or id contains
/// `query`.
pub fn filter_stores<'a>(
    stores: &'a [Store],
    company: Option<CompanyId>,
    query: &str,
) -> Vec<&'a Store> {
    let needle = query.trim().to_lowercase();
    stores
        .iter()
        .filter(|store| company.map_or(true, |id| store.company_id == id))
        .filter(|store| {
            needle.is_empty()
                || contains_ignore_case(&store.name, &needle)
                || store.id.to_string().contains(&needle)
        })
        .collect()
}

pub fn filter_users<'a>(users: &'a [User], company: Option<CompanyId>, query: &str) -> Vec<&'a User> {
    let needle = query.trim().to_lowercase();
    users
        .iter()
        .filter(|user| company.map_or(true, |id| user.company_id == Some(id)))
        .filter(|user| {
            needle.is_empty()
                || contains_ignore_case(&user.name, &needle)
                || contains_ignore_case(&user.email, &needle)
        })
        .collect()
}

/// Slices `items` into fixed-size pages. `page` is clamped into range, and
/// an empty input yields a single empty page.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(per_page);
    let page = page.clamp(1, total_pages.max(1));
    let start = (page - 1) * per_page;
    let end = (start + per_page).min(total_items);

    Page {
        items: items.get(start..end).unwrap_or_default().to_vec(),
        page,
        total_pages,
        total_items,
    }
}

/// Display name of the owning company, or `ID: <id>` when it is not loaded.
pub fn company_label(companies: &[Company], id: CompanyId) -> String {
    companies
        .iter()
        .find(|company| company.id == id)
        .map(|company| company.name.clone())
        .unwrap_or_else(|| format!("ID: {id}"))
}
