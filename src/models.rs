use serde::Deserialize;

/// Every catalog response is wrapped into `{"payload": {"data": ...}}`.
#[derive(Deserialize, Debug)]
pub(crate) struct Envelope<T> {
    pub payload: Payload<T>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct Payload<T> {
    pub data: T,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Person {
    pub full_name: String,
    pub role: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NamedItem {
    pub name: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SeriesEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arts_count: Option<u32>,
    #[serde(default)]
    pub art_order: Option<u32>,
}

/// Book object returned by `GET {api}/{book-id}`.
#[derive(Deserialize, Debug, Clone)]
pub struct Art {
    pub id: u64,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub html_annotation: Option<String>,
    #[serde(default)]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub persons: Vec<Person>,
    #[serde(default)]
    pub genres: Vec<NamedItem>,
    #[serde(default)]
    pub series: Vec<SeriesEntry>,
    #[serde(default)]
    pub tags: Vec<NamedItem>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct FileEntry {
    pub id: u64,
    pub filename: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct FileGroup {
    pub file_type: String,
    #[serde(default)]
    pub files: Vec<FileEntry>,
}
