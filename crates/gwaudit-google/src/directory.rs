//! Admin SDK Directory API: users, groups, members, subscriptions and tokens

use gwaudit_core::{FetchError, Page};

use crate::ApiFetcher;
use crate::client::{ApiError, GoogleClient, endpoint};
use crate::model::{Group, GroupList, Member, MemberList, Token, TokenList, User, UserList};

const BASE: &str = "https://admin.googleapis.com/admin/directory/v1";

/// Customer alias for the tenant the token belongs to.
pub const MY_CUSTOMER: &str = "my_customer";

#[derive(Debug, Clone)]
pub struct DirectoryApi {
    client: GoogleClient,
    customer: String,
    fetcher: ApiFetcher,
}

fn with_query(mut params: Vec<(&'static str, String)>, query: &str) -> Vec<(&'static str, String)> {
    if !query.is_empty() {
        params.push(("query", query.to_string()));
    }
    params
}

impl DirectoryApi {
    pub fn new(client: GoogleClient, customer: impl Into<String>, fetcher: ApiFetcher) -> Self {
        Self {
            client,
            customer: customer.into(),
            fetcher,
        }
    }

    fn listing_params(&self, query: &str) -> Vec<(&'static str, String)> {
        with_query(
            vec![("customer", self.customer.clone()), ("fields", "*".into())],
            query,
        )
    }

    /// One page of `users.list`, optionally filtered by a search `query`.
    pub async fn users_page(&self, query: &str, cursor: String) -> Result<Page<User>, ApiError> {
        let url = endpoint(BASE, &["users"])?;
        self.client
            .list_page::<UserList>(url, &self.listing_params(query), &cursor)
            .await
    }

    pub async fn users(&self, query: &str) -> Result<Vec<User>, FetchError> {
        self.fetcher
            .labelled("Users")
            .fetch_all("", |cursor| self.users_page(query, cursor))
            .await
    }

    /// One page of `groups.list` for the whole customer.
    pub async fn groups_page(&self, query: &str, cursor: String) -> Result<Page<Group>, ApiError> {
        let url = endpoint(BASE, &["groups"])?;
        self.client
            .list_page::<GroupList>(url, &self.listing_params(query), &cursor)
            .await
    }

    pub async fn groups(&self, query: &str) -> Result<Vec<Group>, FetchError> {
        self.fetcher
            .labelled("Groups")
            .fetch_all("", |cursor| self.groups_page(query, cursor))
            .await
    }

    /// One page of `members.list`; `roles` is a comma-separated role filter.
    pub async fn members_page(
        &self,
        group_key: &str,
        roles: Option<&str>,
        cursor: String,
    ) -> Result<Page<Member>, ApiError> {
        let url = endpoint(BASE, &["groups", group_key, "members"])?;
        let mut params = vec![("fields", "*".to_string())];
        if let Some(roles) = roles {
            params.push(("roles", roles.to_string()));
        }
        self.client
            .list_page::<MemberList>(url, &params, &cursor)
            .await
    }

    pub async fn members(
        &self,
        group_key: &str,
        roles: Option<&str>,
    ) -> Result<Vec<Member>, FetchError> {
        self.fetcher
            .labelled(format!("Members of {group_key}"))
            .quiet()
            .fetch_all("", |cursor| self.members_page(group_key, roles, cursor))
            .await
    }

    /// One page of the groups `user_key` belongs to.
    pub async fn subscriptions_page(
        &self,
        user_key: &str,
        cursor: String,
    ) -> Result<Page<Group>, ApiError> {
        let url = endpoint(BASE, &["groups"])?;
        let params = vec![("userKey", user_key.to_string()), ("fields", "*".into())];
        self.client
            .list_page::<GroupList>(url, &params, &cursor)
            .await
    }

    pub async fn subscriptions(&self, user_key: &str) -> Result<Vec<Group>, FetchError> {
        self.fetcher
            .labelled(format!("Subscriptions of {user_key}"))
            .quiet()
            .fetch_all("", |cursor| self.subscriptions_page(user_key, cursor))
            .await
    }

    async fn user_tokens_once(&self, user_key: &str) -> Result<Vec<Token>, ApiError> {
        let url = endpoint(BASE, &["users", user_key, "tokens"])?;
        let list: TokenList = self
            .client
            .send_json(self.client.get(url).query(&[("fields", "*")]))
            .await?;
        Ok(list.items)
    }

    /// Tokens issued by `user_key` to third-party apps (single call, retried).
    pub async fn user_tokens(&self, user_key: &str) -> Result<Vec<Token>, FetchError> {
        self.fetcher
            .labelled(format!("Tokens of {user_key}"))
            .call(|| self.user_tokens_once(user_key))
            .await
    }
}
