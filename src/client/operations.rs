//! GraphQL documents and response payloads used by newsdesk.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::ExecutionError;
use crate::models::{ArticleSummary, User};

/// A named GraphQL document
#[derive(Debug, Clone, Copy)]
pub struct Operation {
    pub name: &'static str,
    pub document: &'static str,
}

macro_rules! user_fields {
    () => {
        "id username email firstName lastName profile { role canWrite canManage canAdmin bio }"
    };
}

macro_rules! article_fields {
    () => {
        "id title excerpt status createdAt updatedAt \
         author { id username firstName lastName } \
         category { id name } tags { id name }"
    };
}

pub const LOGIN: Operation = Operation {
    name: "Login",
    document: concat!(
        "mutation Login($username: String!, $password: String!) { ",
        "tokenAuth(username: $username, password: $password) { ",
        "success errors token refreshToken user { ",
        user_fields!(),
        " } } }"
    ),
};

pub const REFRESH_TOKEN: Operation = Operation {
    name: "RefreshToken",
    document: "mutation RefreshToken($refreshToken: String!) { \
               refreshToken(refreshToken: $refreshToken) { success errors token refreshToken } }",
};

pub const CURRENT_USER: Operation = Operation {
    name: "Me",
    document: concat!("query Me { me { ", user_fields!(), " } }"),
};

pub const ARTICLES: Operation = Operation {
    name: "Articles",
    document: concat!(
        "query Articles($status: String, $authorId: ID) { ",
        "articles(status: $status, authorId: $authorId) { ",
        article_fields!(),
        " } }"
    ),
};

pub const CREATE_ARTICLE: Operation = Operation {
    name: "CreateArticle",
    document: concat!(
        "mutation CreateArticle($input: ArticleInput!) { ",
        "createArticle(input: $input) { success errors article { ",
        article_fields!(),
        " } } }"
    ),
};

pub const SUBMIT_ARTICLE: Operation = Operation {
    name: "SubmitArticle",
    document: concat!(
        "mutation SubmitArticle($id: ID!) { ",
        "submitArticle(id: $id) { success errors article { ",
        article_fields!(),
        " } } }"
    ),
};

pub const PUBLISH_ARTICLE: Operation = Operation {
    name: "PublishArticle",
    document: concat!(
        "mutation PublishArticle($id: ID!) { ",
        "publishArticle(id: $id) { success errors article { ",
        article_fields!(),
        " } } }"
    ),
};

pub const REJECT_ARTICLE: Operation = Operation {
    name: "RejectArticle",
    document: concat!(
        "mutation RejectArticle($id: ID!, $reason: String!) { ",
        "rejectArticle(id: $id, reason: $reason) { success errors article { ",
        article_fields!(),
        " } } }"
    ),
};

pub const UPDATE_USER_ROLE: Operation = Operation {
    name: "UpdateUserRole",
    document: concat!(
        "mutation UpdateUserRole($userId: ID!, $role: String!) { ",
        "updateUserRole(userId: $userId, role: $role) { success errors user { ",
        user_fields!(),
        " } } }"
    ),
};

/// `tokenAuth` result
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub errors: Option<Value>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

/// `refreshToken` result
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshPayload {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub errors: Option<Value>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Common shape of article mutations
#[derive(Debug, Deserialize)]
pub struct ArticleMutationPayload {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub errors: Option<Value>,
    #[serde(default)]
    pub article: Option<ArticleSummary>,
}

#[derive(Debug, Deserialize)]
pub struct UserMutationPayload {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub errors: Option<Value>,
    #[serde(default)]
    pub user: Option<User>,
}

/// Decode `data[field]` into `T`
pub fn extract<T: DeserializeOwned>(data: Value, field: &str) -> Result<T, ExecutionError> {
    let value = match data {
        Value::Object(mut map) => map.remove(field).unwrap_or(Value::Null),
        _ => Value::Null,
    };
    serde_json::from_value(value).map_err(|e| {
        ExecutionError::response(format!("Unexpected shape for '{}': {}", field, e))
    })
}

/// Flatten a mutation `errors` value into readable messages.
///
/// Backends report errors as a plain string, a list of strings, a list of
/// `{message}` objects, or a map of field name to any of those.
pub fn collect_messages(errors: &Value) -> Vec<String> {
    let mut messages = Vec::new();
    collect_into(errors, None, &mut messages);
    messages
}

fn collect_into(value: &Value, field: Option<&str>, out: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::String(s) => {
            if !s.trim().is_empty() {
                match field {
                    Some(f) if f != "nonFieldErrors" && f != "__all__" => {
                        out.push(format!("{}: {}", f, s))
                    }
                    _ => out.push(s.clone()),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_into(item, field, out);
            }
        }
        Value::Object(map) => {
            if let Some(message) = map.get("message") {
                collect_into(message, field, out);
            } else {
                for (key, nested) in map {
                    collect_into(nested, Some(key), out);
                }
            }
        }
        other => out.push(other.to_string()),
    }
}
