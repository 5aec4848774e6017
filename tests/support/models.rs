use active_record_rs::Model;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Model)]
pub struct Post {
    pub id: Option<i64>,
    pub label: String,
    #[model(transient)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl Post {
    pub fn new(label: &str) -> Self {
        Self {
            id: None,
            label: label.to_string(),
            preview: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Model)]
pub struct Person {
    pub id: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Model)]
#[model(name = "Author")]
pub struct Writer {
    #[model(id)]
    pub author_id: Option<i64>,
    pub name: String,
}
