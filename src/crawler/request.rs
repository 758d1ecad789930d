//! Crawl requests and the context they carry between pages

use crate::state::RequestState;
use crate::storage::RequestRecord;
use crate::url::unique_key;
use std::fmt;
use url::Url;

/// Handler label attached to a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    /// A product detail page whose images should be downloaded
    ProductDetail,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProductDetail => "PRODUCT_DETAIL",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "PRODUCT_DETAIL" => Some(Self::ProductDetail),
            _ => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context carried from the page that enqueued a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserData {
    pub collection_name: Option<String>,
    pub product_name: Option<String>,
}

/// A URL queued for fetching, with its label and context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    pub url: Url,
    /// Key used to drop duplicate requests within a run
    pub unique_key: String,
    pub label: Option<Label>,
    pub user_data: UserData,
    /// Number of failed attempts so far
    pub retry_count: u32,
}

impl CrawlRequest {
    pub fn new(url: Url) -> Self {
        let unique_key = unique_key(&url);
        Self {
            url,
            unique_key,
            label: None,
            user_data: UserData::default(),
            retry_count: 0,
        }
    }

    /// A request for a collection page, tagged with the collection's name
    pub fn collection(url: Url, collection_name: &str) -> Self {
        let mut request = Self::new(url);
        request.user_data.collection_name = Some(collection_name.to_string());
        request
    }

    /// A `PRODUCT_DETAIL` request for one product
    pub fn product_detail(url: Url, product_name: &str, collection_name: &str) -> Self {
        let mut request = Self::new(url);
        request.label = Some(Label::ProductDetail);
        request.user_data = UserData {
            collection_name: Some(collection_name.to_string()),
            product_name: Some(product_name.to_string()),
        };
        request
    }

    /// Builds the storage record for this request in `state`
    pub fn to_record(&self, state: RequestState, error_message: Option<&str>) -> RequestRecord {
        RequestRecord {
            url: self.url.to_string(),
            unique_key: self.unique_key.clone(),
            label: self.label.map(|l| l.as_str().to_string()),
            state,
            retry_count: self.retry_count,
            error_message: error_message.map(str::to_string),
        }
    }
}
