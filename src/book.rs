use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Url;

use crate::{
    error::{LitresError, Result},
    models::{Art, FileEntry},
};

lazy_static! {
    static ref MARKUP: Regex =
        Regex::new(r"<.*?>|&([a-z0-9]+|#[0-9]{1,6}|#x[0-9a-f]{1,6});").expect("valid markup regex");
}

const AUTHOR_ROLE: &str = "author";
const NARRATOR_ROLE: &str = "reader";

/// Normalized facts about one book, built from a catalog response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookInfo {
    pub id: u64,
    pub url: String,
    pub uuid: String,
    pub isbn: String,
    pub title: String,
    pub description: String,
    pub cover: String,
    pub author: String,
    pub authors: Vec<String>,
    pub narrator: String,
    pub narrators: Vec<String>,
    pub genres: Vec<String>,
    pub tags: Vec<String>,
    pub series: String,
    pub series_count: u32,
    pub series_num: u32,
    pub published_year: String,
    pub published_date: String,
}

/// One audio file to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub file_id: u64,
    pub filename: String,
    pub url: Url,
}

impl DownloadTask {
    pub fn new(download_base: &Url, book_id: &str, file: &FileEntry) -> Result<Self> {
        let file_id = file.id.to_string();
        let mut url = download_base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("download url cannot be a base: {}", download_base))?
            .pop_if_empty()
            .extend([book_id, file_id.as_str(), file.filename.as_str()]);
        Ok(Self {
            file_id: file.id,
            filename: file.filename.clone(),
            url,
        })
    }
}

/// Extract the numeric book id from a book page url,
/// e.g. `https://www.litres.ru/audiobook/some-author/some-title-69384637/` -> `69384637`.
/// Query string and fragment are ignored.
pub fn book_id_from_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|_| LitresError::InvalidBookUrl(url.to_string()))?;
    let id = parsed
        .path()
        .rsplit('-')
        .next()
        .and_then(|tail| tail.split('/').next())
        .unwrap_or_default();

    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LitresError::InvalidBookUrl(url.to_string()));
    }
    Ok(id.to_string())
}

/// Turn "First [Middle] Last" into "Last First [Middle]".
/// Any other word count is returned as is.
pub fn last_name_first(full_name: &str) -> String {
    let parts: Vec<&str> = full_name.split_whitespace().collect();
    match parts.as_slice() {
        [first, last] => format!("{} {}", last, first),
        [first, middle, last] => format!("{} {} {}", last, first, middle),
        _ => full_name.to_string(),
    }
}

pub fn strip_markup(html: &str) -> String {
    MARKUP.replace_all(html, "").into_owned()
}

fn publication_year(date: &str) -> String {
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(parsed) => parsed.year().to_string(),
        Err(_) => date.split('-').next().unwrap_or_default().to_string(),
    }
}

impl BookInfo {
    pub fn from_art(art: Art, site: &Url) -> Self {
        let url = site
            .join(&art.url)
            .map(String::from)
            .unwrap_or_else(|_| art.url.clone());
        let published_date = art.publication_date.unwrap_or_default();

        let mut info = BookInfo {
            id: art.id,
            url,
            uuid: art.uuid.unwrap_or_default(),
            isbn: art.isbn.unwrap_or_default(),
            title: art.title,
            description: strip_markup(art.html_annotation.as_deref().unwrap_or_default()),
            cover: art.cover_url.unwrap_or_default(),
            published_year: publication_year(&published_date),
            published_date,
            ..Default::default()
        };

        for person in &art.persons {
            let name = last_name_first(&person.full_name);
            match person.role.as_str() {
                AUTHOR_ROLE => {
                    if info.author.is_empty() {
                        info.author = name.clone();
                    }
                    info.authors.push(name);
                }
                NARRATOR_ROLE => {
                    if info.narrator.is_empty() {
                        info.narrator = name.clone();
                    }
                    info.narrators.push(name);
                }
                _ => {}
            }
        }

        info.genres = art.genres.into_iter().map(|g| g.name).collect();
        info.tags = art.tags.into_iter().map(|t| t.name).collect();

        // Only the first series counts, the rest are cross-listings.
        if let Some(series) = art.series.into_iter().next() {
            info.series = series.name.unwrap_or_default();
            info.series_count = series.arts_count.unwrap_or_default();
            info.series_num = series.art_order.unwrap_or_default();
        }

        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NamedItem, Person, SeriesEntry};

    fn person(name: &str, role: &str) -> Person {
        Person {
            full_name: name.to_string(),
            role: role.to_string(),
        }
    }

    fn art() -> Art {
        Art {
            id: 42,
            url: "/audiobook/ivan-ivanov/test-book-42/".to_string(),
            title: "Test Book".to_string(),
            uuid: Some("b5b0a8c2".to_string()),
            isbn: Some("978-5-00000-000-0".to_string()),
            cover_url: Some("/pub/c/cover/42.jpg".to_string()),
            html_annotation: Some("<p>Some &amp; <b>story</b></p>".to_string()),
            publication_date: Some("2021-03-04".to_string()),
            persons: vec![
                person("Ivan Ivanov", "author"),
                person("Petr Petrovich Petrov", "author"),
                person("Anna Smirnova", "reader"),
                person("Someone Else", "translator"),
            ],
            genres: vec![NamedItem {
                name: "Fantasy".to_string(),
            }],
            series: vec![],
            tags: vec![NamedItem {
                name: "magic".to_string(),
            }],
        }
    }

    fn site() -> Url {
        Url::parse("https://www.litres.ru").unwrap()
    }

    #[test]
    fn reorders_two_and_three_word_names() {
        assert_eq!(last_name_first("Ivan Ivanov"), "Ivanov Ivan");
        assert_eq!(last_name_first("Ivan Ivanovich Ivanov"), "Ivanov Ivan Ivanovich");
        assert_eq!(last_name_first("Homer"), "Homer");
        assert_eq!(last_name_first("A B C D"), "A B C D");
    }

    #[test]
    fn extracts_book_id() {
        assert_eq!(
            book_id_from_url("https://www.litres.ru/audiobook/ivan-ivanov/test-book-69384637/")
                .unwrap(),
            "69384637"
        );
        assert_eq!(
            book_id_from_url("https://www.litres.ru/audiobook/x/y-123").unwrap(),
            "123"
        );
        assert!(matches!(
            book_id_from_url("https://www.litres.ru/audiobook/"),
            Err(LitresError::InvalidBookUrl(_))
        ));
        assert_eq!(
            book_id_from_url("https://www.litres.ru/audiobook/x/title-123/?lfrom=5#reviews").unwrap(),
            "123"
        );
        assert_eq!(
            book_id_from_url("https://www.litres.ru/audiobook/x/title-123?utm_source=a-b").unwrap(),
            "123"
        );
        assert!(matches!(
            book_id_from_url("title-123"),
            Err(LitresError::InvalidBookUrl(_))
        ));
    }

    #[test]
    fn maps_people_and_description() {
        let info = BookInfo::from_art(art(), &site());
        assert_eq!(info.url, "https://www.litres.ru/audiobook/ivan-ivanov/test-book-42/");
        assert_eq!(info.author, "Ivanov Ivan");
        assert_eq!(info.authors, vec!["Ivanov Ivan", "Petrov Petr Petrovich"]);
        assert_eq!(info.narrator, "Smirnova Anna");
        assert_eq!(info.narrators, vec!["Smirnova Anna"]);
        assert_eq!(info.description, "Some  story");
        assert_eq!(info.published_year, "2021");
        assert_eq!(info.genres, vec!["Fantasy"]);
        assert_eq!(info.tags, vec!["magic"]);
        assert_eq!(info.series, "");
        assert_eq!(info.series_num, 0);
    }

    #[test]
    fn missing_people_leave_empty_fields() {
        let mut art = art();
        art.persons.clear();
        let info = BookInfo::from_art(art, &site());
        assert_eq!(info.author, "");
        assert!(info.authors.is_empty());
        assert_eq!(info.narrator, "");
    }

    #[test]
    fn only_first_series_is_used() {
        let mut art = art();
        art.series = vec![
            SeriesEntry {
                name: Some("Cycle".to_string()),
                arts_count: Some(5),
                art_order: Some(2),
            },
            SeriesEntry {
                name: Some("Other".to_string()),
                arts_count: Some(9),
                art_order: Some(7),
            },
        ];
        let info = BookInfo::from_art(art, &site());
        assert_eq!(info.series, "Cycle");
        assert_eq!(info.series_count, 5);
        assert_eq!(info.series_num, 2);
    }

    #[test]
    fn first_series_with_gaps_is_not_merged_with_later_ones() {
        let mut art = art();
        art.series = vec![
            SeriesEntry {
                name: Some("Cycle".to_string()),
                ..Default::default()
            },
            SeriesEntry {
                name: Some("Other".to_string()),
                arts_count: Some(9),
                art_order: Some(7),
            },
        ];
        let info = BookInfo::from_art(art, &site());
        assert_eq!(info.series, "Cycle");
        assert_eq!(info.series_count, 0);
        assert_eq!(info.series_num, 0);
    }

    #[test]
    fn year_falls_back_to_leading_component() {
        assert_eq!(publication_year("2019"), "2019");
        assert_eq!(publication_year("2019-05"), "2019");
        assert_eq!(publication_year(""), "");
    }

    #[test]
    fn download_task_url_layout() {
        let base = Url::parse("https://www.litres.ru/download_book_subscr/").unwrap();
        let file = FileEntry {
            id: 555,
            filename: "01 chapter.mp3".to_string(),
        };
        let task = DownloadTask::new(&base, "42", &file).unwrap();
        assert_eq!(
            task.url.as_str(),
            "https://www.litres.ru/download_book_subscr/42/555/01%20chapter.mp3"
        );
    }
}
