//! Atom feed of the latest posts

use crate::cache::{get_or_load, SharedCache};
use crate::config::SiteConfig;
use crate::db::repositories::PostRepository;
use crate::models::PostSummary;
use crate::services::markdown::{plain_text, truncate_words};
use crate::services::FEED_CACHE_KEY;
use anyhow::Result;
use atom_syndication::{Entry, Feed, FixedDateTime, Link, Person, Text};
use chrono::Utc;
use std::sync::Arc;

pub struct FeedService {
    repo: Arc<dyn PostRepository>,
    cache: SharedCache,
    site: SiteConfig,
}

impl FeedService {
    pub fn new(repo: Arc<dyn PostRepository>, cache: SharedCache, site: SiteConfig) -> Self {
        Self { repo, cache, site }
    }

    /// Serialized Atom document
    pub async fn atom(&self) -> Result<String> {
        get_or_load(&*self.cache, FEED_CACHE_KEY, self.cache.default_ttl(), || async {
            let posts = self.repo.latest_published(self.site.feed_items as i64).await?;
            Ok(build_feed(&self.site, &posts).to_string())
        })
        .await
    }
}

fn alternate(href: String) -> Link {
    let mut link = Link::default();
    link.set_href(href);
    link.set_rel("alternate");
    link
}

pub fn build_feed(site: &SiteConfig, posts: &[PostSummary]) -> Feed {
    let home = site.absolute_url("/blog/");
    let updated: FixedDateTime = posts
        .iter()
        .map(|p| p.post.updated)
        .max()
        .unwrap_or_else(Utc::now)
        .fixed_offset();

    let mut feed = Feed::default();
    feed.set_title(site.name.clone());
    feed.set_subtitle(Some(Text::plain(site.description.clone())));
    feed.set_id(home.clone());
    feed.set_updated(updated);
    feed.set_links(vec![alternate(home)]);
    feed.set_entries(
        posts
            .iter()
            .map(|summary| entry(site, summary))
            .collect::<Vec<_>>(),
    );
    feed
}

fn entry(site: &SiteConfig, summary: &PostSummary) -> Entry {
    let post = &summary.post;
    let url = site.absolute_url(&summary.url);

    let mut author = Person::default();
    author.set_name(summary.author_name.clone());

    let mut entry = Entry::default();
    entry.set_title(post.title.clone());
    entry.set_id(url.clone());
    entry.set_links(vec![alternate(url)]);
    entry.set_updated(post.updated.fixed_offset());
    entry.set_published(Some(post.publish.fixed_offset()));
    entry.set_authors(vec![author]);
    entry.set_summary(Some(Text::plain(truncate_words(
        &plain_text(&post.body),
        site.feed_summary_words,
    ))));
    entry
}
