//! List pages.

use std::sync::Arc;

use anyhow::Result;
use clap::ValueEnum;
use frosted_pages::{Page, PageSnapshot, Pageset};

use super::config::ConfigFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Order {
    Path,
    Created,
    Modified,
    Time,
}

/// Subset selection; `trim` only applies together with `prefix`.
#[derive(Debug, Default)]
pub struct Filter {
    pub tag: Option<String>,
    pub prefix: Option<String>,
    pub trim: String,
}

/// Run the list command.
pub async fn run(config: &ConfigFile, order: Order, filter: Filter, json: bool) -> Result<()> {
    let mut set = super::load_pageset(config)?;
    let pages = select(&mut set, order, &filter)?;

    if json {
        let snapshots: Vec<PageSnapshot> = pages.iter().map(|page| page.snapshot()).collect();
        println!("{}", serde_json::to_string_pretty(&snapshots)?);
        return Ok(());
    }

    for page in &pages {
        println!(
            "{}\t{}\t{}",
            page.key(),
            page.time().format("%Y-%m-%d"),
            page.title()
        );
    }
    tracing::debug!("{} pages listed", pages.len());

    Ok(())
}

fn select(set: &mut Pageset, order: Order, filter: &Filter) -> Result<Vec<Arc<Page>>> {
    let mut selected = set;
    if let Some(prefix) = &filter.prefix {
        selected = selected.path_subset(prefix, &filter.trim)?;
    }
    if let Some(tag) = &filter.tag {
        selected = selected.tag_subset(tag)?;
    }

    let pages = match order {
        Order::Path => selected.by_path(),
        Order::Created => selected.by_created(),
        Order::Modified => selected.by_mod_time(),
        Order::Time => selected.by_time(),
    };
    Ok(pages.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use frosted_pages::ParserRegistry;
    use serde_json::json;

    fn set() -> Pageset {
        let pages = [
            ("/docs/index.md", json!({"Tags": ["guide"], "Created": "2021-01-01"})),
            ("/docs/setup.md", json!({"Tags": ["guide", "ops"], "Created": "2022-01-01"})),
            ("/blog/news.md", json!({"Tags": ["ops"], "Created": "2023-01-01"})),
        ]
        .into_iter()
        .map(|(path, meta)| {
            let page = Page::new_virtual(path, "").unwrap();
            if let serde_json::Value::Object(map) = meta {
                page.set_meta(map);
            }
            Arc::new(page)
        });
        Pageset::from_pages("/site", Arc::new(ParserRegistry::default()), pages).unwrap()
    }

    fn keys(pages: &[Arc<Page>]) -> Vec<&str> {
        pages.iter().map(|p| p.key()).collect()
    }

    #[test]
    fn lists_everything_by_path() {
        let mut set = set();

        let pages = select(&mut set, Order::Path, &Filter::default()).unwrap();

        // Index pages lead their depth.
        assert_eq!(keys(&pages), vec!["/docs/index", "/blog/news", "/docs/setup"]);
    }

    #[test]
    fn combines_prefix_and_tag() {
        let mut set = set();
        let filter = Filter {
            tag: Some("OPS".to_string()),
            prefix: Some("/docs".to_string()),
            trim: String::new(),
        };

        let pages = select(&mut set, Order::Created, &filter).unwrap();

        assert_eq!(keys(&pages), vec!["/docs/setup"]);
    }

    #[test]
    fn orders_newest_first() {
        let mut set = set();

        let pages = select(&mut set, Order::Time, &Filter::default()).unwrap();

        assert_eq!(keys(&pages), vec!["/blog/news", "/docs/setup", "/docs/index"]);
    }
}
