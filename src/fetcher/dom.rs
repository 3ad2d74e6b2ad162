//! Selector queries over a static HTML document.
//!
//! Shared by every fetcher that holds the page as markup. Documents are
//! parsed per call; `scraper::Html` is not `Send`, so it is never held
//! across an await point.

use super::Target;
use crate::error::FetchError;
use scraper::{ElementRef, Html, Selector};

fn parse_selector(selector: &str) -> Result<Selector, FetchError> {
    Selector::parse(selector).map_err(|_| FetchError::InvalidSelector(selector.to_string()))
}

fn read(element: ElementRef<'_>, target: Target<'_>) -> Option<String> {
    let value = match target {
        Target::Text => element.text().collect::<Vec<_>>().join(" "),
        Target::Attr(name) => element.value().attr(name)?.to_string(),
    };
    let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if value.is_empty() { None } else { Some(value) }
}

pub fn has_match(html: &str, selector: &str) -> Result<bool, FetchError> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);
    Ok(document.select(&selector).next().is_some())
}

pub fn select_one(
    html: &str,
    selector: &str,
    target: Target<'_>,
) -> Result<Option<String>, FetchError> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);
    Ok(document.select(&selector).find_map(|el| read(el, target)))
}

pub fn select_all(
    html: &str,
    row_selector: &str,
    inner_selector: Option<&str>,
    target: Target<'_>,
) -> Result<Vec<String>, FetchError> {
    let rows = parse_selector(row_selector)?;
    let inner = inner_selector.map(parse_selector).transpose()?;
    let document = Html::parse_document(html);

    let values = document
        .select(&rows)
        .filter_map(|row| match &inner {
            Some(inner) => row.select(inner).next().and_then(|el| read(el, target)),
            None => read(row, target),
        })
        .collect();
    Ok(values)
}

pub fn select_rows(
    html: &str,
    row_selector: &str,
    fields: &[(&str, Target<'_>)],
) -> Result<Vec<Vec<Option<String>>>, FetchError> {
    let rows = parse_selector(row_selector)?;
    let fields = fields
        .iter()
        .map(|(sel, target)| parse_selector(sel).map(|s| (s, *target)))
        .collect::<Result<Vec<_>, _>>()?;
    let document = Html::parse_document(html);

    let table = document
        .select(&rows)
        .map(|row| {
            fields
                .iter()
                .map(|(sel, target)| row.select(sel).find_map(|el| read(el, *target)))
                .collect()
        })
        .collect();
    Ok(table)
}
