//! List site content

use anyhow::Result;

use crate::content::loader::ContentLoader;
use crate::content::DocumentSummary;
use crate::helpers::{encode_path, url_for};
use crate::layout::{LayoutRegistry, Layouts};
use crate::Site;

/// Collect a summary of every document, newest first
pub fn documents(site: &Site) -> Result<Vec<DocumentSummary>> {
    let loader = ContentLoader::new(site);
    let mut summaries: Vec<_> = loader
        .load_documents()?
        .iter()
        .map(|doc| doc.summary(url_for(&site.config, &encode_path(&doc.path))))
        .collect();
    summaries.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.source.cmp(&b.source)));
    Ok(summaries)
}

/// List site content by type
pub fn run(site: &Site, content_type: &str, json: bool) -> Result<()> {
    match content_type {
        "doc" | "docs" | "page" | "pages" => {
            let summaries = documents(site)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
                return Ok(());
            }
            println!("Documents ({}):", summaries.len());
            for doc in summaries {
                println!(
                    "  {} - {} [{}]",
                    doc.date.as_deref().unwrap_or("----------"),
                    doc.title,
                    doc.source
                );
            }
        }
        "layout" | "layouts" => {
            let layouts = Layouts::load(&site.config, &site.layouts_dir, &site.includes_dir)?;
            let names = layouts.names();
            if json {
                println!("{}", serde_json::to_string_pretty(&names)?);
                return Ok(());
            }
            println!("Layouts ({}):", names.len());
            for name in names {
                match layouts.resolve(name).and_then(|layout| layout.parent()) {
                    Some(parent) => println!("  {} -> {}", name, parent),
                    None => println!("  {}", name),
                }
            }
        }
        _ => {
            anyhow::bail!(
                "Unknown type: {}. Available: page, layout",
                content_type
            );
        }
    }

    Ok(())
}
