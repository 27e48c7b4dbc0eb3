//! IAM API: service accounts of a project

use gwaudit_core::{FetchError, Page};

use crate::ApiFetcher;
use crate::client::{ApiError, GoogleClient, endpoint};
use crate::model::{ServiceAccount, ServiceAccountList};

const BASE: &str = "https://iam.googleapis.com/v1";

#[derive(Debug, Clone)]
pub struct IamApi {
    client: GoogleClient,
    fetcher: ApiFetcher,
}

impl IamApi {
    pub fn new(client: GoogleClient, fetcher: ApiFetcher) -> Self {
        Self { client, fetcher }
    }

    pub async fn service_accounts_page(
        &self,
        project_id: &str,
        cursor: String,
    ) -> Result<Page<ServiceAccount>, ApiError> {
        let url = endpoint(BASE, &["projects", project_id, "serviceAccounts"])?;
        self.client
            .list_page::<ServiceAccountList>(url, &[("fields", "*".into())], &cursor)
            .await
    }

    /// Service accounts of `project_id`. Projects rarely have more than one
    /// page, but the cursor is followed anyway.
    pub async fn service_accounts(
        &self,
        project_id: &str,
    ) -> Result<Vec<ServiceAccount>, FetchError> {
        self.fetcher
            .labelled(format!("Service accounts of {project_id}"))
            .quiet()
            .fetch_all("", |cursor| self.service_accounts_page(project_id, cursor))
            .await
    }
}
