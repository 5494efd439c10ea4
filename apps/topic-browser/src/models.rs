use serde::{Deserialize, Serialize};

/// A GitHub topic as returned by the topic search API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub curated: bool,
}

impl Topic {
    pub fn title(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn url(&self) -> String {
        format!("https://github.com/topics/{}", self.name)
    }
}

/// A saved topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: u32,
    pub topic: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl Bookmark {
    pub fn new(id: u32, topic: &str) -> Self {
        Self {
            id,
            topic: topic.to_string(),
            url: format!("https://github.com/topics/{topic}"),
            note: String::new(),
            tags: Vec::new(),
            attachments: Vec::new(),
        }
    }
}
