//! Cloud Resource Manager API: projects visible to the caller

use gwaudit_core::{FetchError, Page};

use crate::ApiFetcher;
use crate::client::{ApiError, GoogleClient, endpoint};
use crate::model::{Project, ProjectList};

const BASE: &str = "https://cloudresourcemanager.googleapis.com/v1";

#[derive(Debug, Clone)]
pub struct ResourceManagerApi {
    client: GoogleClient,
    fetcher: ApiFetcher,
}

impl ResourceManagerApi {
    pub fn new(client: GoogleClient, fetcher: ApiFetcher) -> Self {
        Self { client, fetcher }
    }

    pub async fn projects_page(&self, cursor: String) -> Result<Page<Project>, ApiError> {
        let url = endpoint(BASE, &["projects"])?;
        self.client
            .list_page::<ProjectList>(url, &[("fields", "*".into())], &cursor)
            .await
    }

    pub async fn projects(&self) -> Result<Vec<Project>, FetchError> {
        self.fetcher
            .labelled("Projects")
            .fetch_all("", |cursor| self.projects_page(cursor))
            .await
    }
}
