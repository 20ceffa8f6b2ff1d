use serde::Serialize;

use crate::{
    constants::{MAX_PAGE_SIZE, PAGE_SIZE},
    error::not_found,
    form::{Form, FormData},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// `page` must be a positive integer whose rows are addressable; a bad `limit` falls back
    /// to the default page size.
    pub fn from_form(form: &Form) -> Result<Self, potion::Error> {
        let page = match form.get_number::<i64>("page") {
            Ok(Some(page)) if page >= 1 => page,
            Ok(None) => 1,
            _ => return Err(not_found("Invalid page.")),
        };

        let limit = match form.get_number::<i64>("limit") {
            Ok(Some(limit)) if limit >= 1 => limit.min(MAX_PAGE_SIZE),
            _ => PAGE_SIZE,
        };

        // The end of the page has to fit too, `from_rows` compares it against the total.
        if page.checked_mul(limit).is_none() {
            return Err(not_found("Invalid page."));
        }

        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1).saturating_mul(self.limit)
    }
}

/// Absolute location of a listing, with the filters that every page link repeats.
#[derive(Debug, Clone)]
pub struct PageLink {
    location: String,
    params: FormData,
}

impl PageLink {
    pub fn new(base_url: &str, path: &str, form: &Form) -> Self {
        Self {
            location: format!("{}{}", base_url.trim_end_matches('/'), path),
            params: form.pairs_without(&["page", "limit"]),
        }
    }

    pub fn href(&self, page: i64, limit: i64) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter())
            .append_pair("page", &page.to_string())
            .append_pair("limit", &limit.to_string())
            .finish();

        format!("{}?{}", self.location, query)
    }
}

#[derive(Serialize, Debug)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    pub fn from_rows(
        rows: Vec<T>,
        total_rows: i64,
        request: &PageRequest,
        link: &PageLink,
    ) -> Result<Self, potion::Error> {
        if rows.is_empty() {
            if request.page > 1 {
                return Err(not_found("Invalid page."));
            }
            return Ok(Self::no_rows());
        }

        let end = request.page.saturating_mul(request.limit);
        let next = if end < total_rows {
            Some(link.href(request.page + 1, request.limit))
        } else {
            None
        };
        let previous = if request.page > 1 {
            Some(link.href(request.page - 1, request.limit))
        } else {
            None
        };

        Ok(Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        })
    }

    pub fn no_rows() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: vec![],
        }
    }
}
