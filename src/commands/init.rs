//! Initialize a new site

use anyhow::{bail, Result};
use std::fs;
use std::path::Path;

use super::user;
use crate::config::SiteConfig;
use crate::content::{ContentRepository, EntryDraft, EntryKind};
use crate::data::{NavItem, Role};
use crate::{Site, CONFIG_FILE};

const ADMIN_USERNAME: &str = "admin";

/// Length of the generated admin password
const ADMIN_PASSWORD_LEN: usize = 16;

const SAMPLE_PAGE: &str = r#"This is an example page. Pages live at the top level of the site and
can be linked from the navigation menu.

Edit or delete it from the admin panel at [/admin](/admin).
"#;

const SAMPLE_POST: &str = r#"Welcome to your new site! This is your very first post.

## Quick Start

Sign in to the admin panel at `/admin` with the credentials printed by
`marques init`, then:

- write posts and pages in markdown,
- upload images to the media library,
- arrange the navigation menu.

<!-- more -->

Run the server with:

```bash
$ marques serve
```
"#;

/// What `init` created
#[derive(Debug)]
pub struct InitReport {
    pub admin_username: String,
    pub admin_password: String,
}

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<InitReport> {
    let config_path = target_dir.join(CONFIG_FILE);
    if config_path.exists() {
        bail!("{:?} already exists; refusing to overwrite it", config_path);
    }

    fs::create_dir_all(target_dir)?;
    let config = SiteConfig::default();
    fs::write(&config_path, config.to_yaml()?)?;

    let site = Site::with_config(target_dir, config);
    let registry = site.registry();
    registry.ensure_dirs()?;

    let content = ContentRepository::new(&registry)?;
    if content.get(EntryKind::Page, "about")?.is_none() {
        let about = EntryDraft {
            title: "About".to_string(),
            slug: "about".to_string(),
            status: "published".to_string(),
            body: SAMPLE_PAGE.to_string(),
            ..EntryDraft::default()
        };
        content.save(EntryKind::Page, &about, None)?;
    }
    if content.get(EntryKind::Post, "hello-world")?.is_none() {
        let hello = EntryDraft {
            title: "Hello World".to_string(),
            slug: "hello-world".to_string(),
            status: "published".to_string(),
            tags: "welcome".to_string(),
            body: SAMPLE_POST.to_string(),
            ..EntryDraft::default()
        };
        content.save(EntryKind::Post, &hello, None)?;
    }

    let data = site.open_data()?;
    if !data.navigation()?.iter().any(|i| i.url == "/about") {
        let position = data.navigation()?.len() as i64;
        data.add_nav_item(&NavItem::new("About", "/about", position))?;
    }

    let admin_password = user::add_user(&data, ADMIN_USERNAME, Role::Admin, None, ADMIN_PASSWORD_LEN)?;
    tracing::info!("Initialized site in {:?}", target_dir);

    Ok(InitReport {
        admin_username: ADMIN_USERNAME.to_string(),
        admin_password,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_site() {
        let dir = TempDir::new().unwrap();
        let report = init_site(dir.path()).unwrap();

        assert!(dir.path().join(CONFIG_FILE).exists());
        assert!(dir.path().join("content/pages/about.md").exists());
        assert!(dir.path().join("content/posts/hello-world.md").exists());
        assert!(dir.path().join("media").is_dir());

        let site = Site::new(dir.path()).unwrap();
        let data = site.open_data().unwrap();
        let admin = data.user_by_username("admin").unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(report.admin_password.len(), ADMIN_PASSWORD_LEN);
        assert!(verify_password(&report.admin_password, &admin.password_hash));
        assert!(data.navigation().unwrap().iter().any(|i| i.url == "/about"));
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "title: Mine\n").unwrap();
        assert!(init_site(dir.path()).is_err());
        assert_eq!(
            fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap(),
            "title: Mine\n"
        );
    }
}
