//! Response models for the list calls used by the audit.
//!
//! Only the fields the reports read are modelled; everything else in the
//! response is ignored.

use gwaudit_core::Page;
use serde::{Deserialize, Deserializer, Serialize};

/// A list response that can be turned into one [`Page`].
pub trait ListResponse {
    type Item;
    fn into_page(self) -> Page<Self::Item>;
}

/// Google encodes int64 values as JSON strings; accept either form.
fn int64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(i64),
        Str(String),
    }
    match Raw::deserialize(d)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub id: String,
    pub primary_email: String,
    pub archived: bool,
    pub is_admin: bool,
    pub is_delegated_admin: bool,
    pub suspended: bool,
    pub is_mailbox_setup: bool,
    pub last_login_time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Group {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(deserialize_with = "int64")]
    pub direct_members_count: i64,
    pub admin_created: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Member {
    pub id: String,
    pub email: String,
    pub role: String,
    #[serde(rename = "type")]
    pub member_type: String,
    pub status: String,
}

/// OAuth token a user granted to a third-party application.
///
/// Serialized back in the API's own camelCase shape for the users report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Token {
    pub client_id: String,
    pub display_text: String,
    pub kind: String,
    pub scopes: Vec<String>,
    pub anonymous: bool,
    pub native_app: bool,
    pub user_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Project {
    pub project_id: String,
    #[serde(deserialize_with = "int64")]
    pub project_number: i64,
    pub name: String,
    pub lifecycle_state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceAccount {
    pub email: String,
    pub oauth2_client_id: String,
    pub project_id: String,
    pub unique_id: String,
    pub disabled: bool,
}

/// Shared drive metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Drive {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Permission {
    pub id: String,
    /// `user`, `group`, `domain` or `anyone`.
    #[serde(rename = "type")]
    pub grantee_type: String,
    pub role: String,
    pub email_address: String,
    pub domain: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileOwner {
    pub email_address: String,
    pub display_name: String,
}

/// A Drive file: an uploaded report or a search hit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub web_view_link: String,
    #[serde(deserialize_with = "int64")]
    pub size: i64,
    pub owners: Vec<FileOwner>,
    pub created_time: String,
    pub viewed_by_me_time: String,
    pub shared: bool,
    /// Shared drive holding the file; empty for My Drive files.
    #[serde(alias = "teamDriveId")]
    pub drive_id: String,
}

macro_rules! list_response {
    ($name:ident, $field:ident, $item:ty) => {
        #[derive(Debug, Default, Deserialize)]
        #[serde(rename_all = "camelCase", default)]
        pub struct $name {
            pub $field: Vec<$item>,
            pub next_page_token: String,
        }

        impl ListResponse for $name {
            type Item = $item;
            fn into_page(self) -> Page<$item> {
                Page::new(self.$field, self.next_page_token)
            }
        }
    };
}

list_response!(UserList, users, User);
list_response!(GroupList, groups, Group);
list_response!(MemberList, members, Member);
list_response!(ProjectList, projects, Project);
list_response!(ServiceAccountList, accounts, ServiceAccount);
list_response!(DriveList, drives, Drive);
list_response!(PermissionList, permissions, Permission);
list_response!(FileList, files, DriveFile);

/// `users.tokens.list` returns everything in one response.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TokenList {
    pub items: Vec<Token>,
}
