//! List site content

use anyhow::{bail, Result};

use crate::content::{ContentRepository, EntryKind};
use crate::Site;

/// List site content by type
pub fn run(site: &Site, content_type: &str) -> Result<()> {
    match content_type {
        "page" | "pages" | "post" | "posts" => {
            let kind = if content_type.starts_with("page") {
                EntryKind::Page
            } else {
                EntryKind::Post
            };
            let entries = ContentRepository::new(&site.registry())?.list(kind)?;
            println!("{}s ({}):", kind.label(), entries.len());
            for entry in entries {
                println!(
                    "  {} - {} [{}] {}",
                    entry.date.format("%Y-%m-%d"),
                    entry.title,
                    entry.status,
                    entry.path
                );
            }
        }
        "user" | "users" => {
            let users = site.open_data()?.users()?;
            println!("Users ({}):", users.len());
            for user in users {
                println!("  {} ({})", user.username, user.role);
            }
        }
        "nav" | "navigation" => {
            let items = site.open_data()?.navigation()?;
            println!("Navigation ({}):", items.len());
            for item in items {
                let indent = if item.parent_id.is_some() { "    " } else { "  " };
                let hidden = if item.visible { "" } else { " (hidden)" };
                println!("{}{} -> {}{}", indent, item.label, item.url, hidden);
            }
        }
        "redirect" | "redirects" => {
            let mappings = site.open_data()?.url_mappings()?;
            println!("Redirects ({}):", mappings.len());
            for mapping in mappings {
                println!("  {} -> {} ({})", mapping.from, mapping.to, mapping.status);
            }
        }
        other => bail!(
            "Unknown type '{}'. Available: pages, posts, users, navigation, redirects",
            other
        ),
    }

    Ok(())
}
