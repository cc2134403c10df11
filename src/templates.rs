use askama::Template; // bring trait in scope

use crate::book::BookInfo;

#[derive(Template)]
#[template(path = "metadata.opf", escape = "html")]
pub struct MetadataOpf<'a> {
    pub book: &'a BookInfo,
    pub language: &'a str,
}
