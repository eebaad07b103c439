use crate::config::FilterConfig;
use crate::model::Item;

/// Report-time item filter built from the `[filters]` section
///
/// Filters only shape what a command reports; archives always keep every
/// collected item.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    min_followers: u64,
    verified_only: bool,
    exclude_retweets: bool,
    exclude_replies: bool,
    languages: Vec<String>,
}

impl ItemFilter {
    pub fn from_config(config: &FilterConfig) -> Self {
        Self {
            min_followers: config.min_followers,
            verified_only: config.verified_only,
            exclude_retweets: config.exclude_retweets,
            exclude_replies: config.exclude_replies,
            languages: config
                .languages
                .iter()
                .map(|l| l.trim().to_ascii_lowercase())
                .filter(|l| !l.is_empty())
                .collect(),
        }
    }

    /// Returns true if no rule is active
    pub fn is_empty(&self) -> bool {
        self.min_followers == 0
            && !self.verified_only
            && !self.exclude_retweets
            && !self.exclude_replies
            && self.languages.is_empty()
    }

    pub fn matches(&self, item: &Item) -> bool {
        if item.author.follower_count < self.min_followers {
            return false;
        }
        if self.verified_only && !item.author.verified {
            return false;
        }
        if self.exclude_retweets && item.flags.is_retweet {
            return false;
        }
        if self.exclude_replies && item.flags.is_reply {
            return false;
        }
        if !self.languages.is_empty() && !self.languages.contains(&item.lang.to_ascii_lowercase()) {
            return false;
        }
        true
    }

    /// Keeps the matching items, preserving order
    pub fn apply<'a>(&self, items: &'a [Item]) -> Vec<&'a Item> {
        items.iter().filter(|item| self.matches(item)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_item;

    #[test]
    fn test_empty_filter_keeps_everything() {
        let filter = ItemFilter::from_config(&FilterConfig::default());
        assert!(filter.is_empty());
        let items = vec![test_item("1"), test_item("2")];
        assert_eq!(filter.apply(&items).len(), 2);
    }

    #[test]
    fn test_follower_and_verified_rules() {
        let filter = ItemFilter::from_config(&FilterConfig {
            min_followers: 100,
            verified_only: true,
            ..Default::default()
        });

        let mut popular = test_item("1");
        popular.author.follower_count = 500;
        popular.author.verified = true;
        let mut small = test_item("2");
        small.author.follower_count = 5;
        small.author.verified = true;
        let mut unverified = test_item("3");
        unverified.author.follower_count = 500;

        assert!(filter.matches(&popular));
        assert!(!filter.matches(&small));
        assert!(!filter.matches(&unverified));
    }

    #[test]
    fn test_flag_and_language_rules() {
        let filter = ItemFilter::from_config(&FilterConfig {
            exclude_retweets: true,
            exclude_replies: true,
            languages: vec!["EN".to_string(), " ja ".to_string()],
            ..Default::default()
        });

        let mut retweet = test_item("1");
        retweet.flags.is_retweet = true;
        let mut reply = test_item("2");
        reply.flags.is_reply = true;
        let mut german = test_item("3");
        german.lang = "de".to_string();
        let mut japanese = test_item("4");
        japanese.lang = "ja".to_string();

        let items = vec![retweet, reply, german, japanese, test_item("5")];
        let kept: Vec<&str> = filter.apply(&items).iter().map(|i| i.id.as_str()).collect();
        assert_eq!(kept, vec!["4", "5"]);
    }
}
